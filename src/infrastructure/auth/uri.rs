/// Domain (scheme and host) of `uri`: everything before the first `/` after `//`
pub fn get_domain(uri: &str) -> &str {
    let host_start = uri.find("//").map_or(0, |i| i + 2);

    match uri[host_start..].find('/') {
        Some(0) | None => uri,
        Some(i) => &uri[..host_start + i],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_domain() {
        assert_eq!(get_domain("https://example.net/path/to"), "https://example.net");
        assert_eq!(get_domain("https://example.net"), "https://example.net");
        assert_eq!(get_domain("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(get_domain("example.net/path"), "example.net");
        assert_eq!(get_domain(""), "");
    }
}
