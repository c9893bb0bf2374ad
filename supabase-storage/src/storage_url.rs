#[derive(Debug, Clone)]
pub struct StorageURL(String);

impl AsRef<str> for StorageURL {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl StorageURL {
    /// Creates the storage API root, `{endpoint}/storage/v1`.
    pub fn new(endpoint: &str) -> Self {
        Self(format!("{}/storage/v1", endpoint.trim_end_matches('/')))
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    /// `{root}/object/{bucket}/{key}`
    pub fn object(&self, bucket: &str, key: &str) -> Self {
        self.append_path("object")
            .append_path(bucket)
            .append_path(key)
    }

    /// `{root}/object/sign/{bucket}/{key}`
    pub fn sign(&self, bucket: &str, key: &str) -> Self {
        self.append_path("object/sign")
            .append_path(bucket)
            .append_path(key)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
