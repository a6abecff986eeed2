use std::path::Path;

use crate::error::{Error, Result};

pub(crate) fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Join a candidate base (directory or base URL) with a file name.
pub(crate) fn join_location(base: &str, file_name: &str) -> String {
    if is_url(base) {
        format!("{}/{}", base.trim_end_matches('/'), file_name)
    } else {
        Path::new(base).join(file_name).to_string_lossy().into_owned()
    }
}

/// Read a resource from the local filesystem or over HTTP(S).
pub(crate) fn fetch_bytes(location: &str) -> Result<Vec<u8>> {
    if is_url(location) {
        let response = reqwest::blocking::get(location)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::InvalidInput(format!(
                "fetching {location}: HTTP {status}"
            )));
        }
        Ok(response.bytes()?.to_vec())
    } else {
        Ok(std::fs::read(location)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_urls_and_paths() {
        assert_eq!(
            join_location("https://cdn.example.com/fonts/", "Inter-Bold.ttf"),
            "https://cdn.example.com/fonts/Inter-Bold.ttf"
        );
        let joined = join_location("fonts", "Inter-Bold.ttf");
        assert!(joined.ends_with("Inter-Bold.ttf"));
        assert!(joined.starts_with("fonts"));
    }
}
