/// Normalize a website value from an input row into a bare lowercase domain.
/// Strips URL schemes, `www.` prefixes, paths, ports and query strings.
pub fn normalize_website(website: &str) -> String {
    let mut domain = website.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }

    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }

    // Drop everything after the host part
    for sep in ['/', '?', '#', ':'] {
        if let Some(idx) = domain.find(sep) {
            domain.truncate(idx);
        }
    }

    domain
}

/// Basic domain validation for input rows
pub fn is_valid_domain(domain: &str) -> bool {
    if !domain.contains('.') {
        return false;
    }

    if domain.contains("://") || domain.contains('/') {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.')
        || domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }

    if domain.contains("..") {
        return false;
    }

    domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Extract the organizational apex domain (e.g. finance.acme.com -> acme.com)
pub fn extract_base_domain(domain: &str) -> String {
    let domain = domain.to_lowercase();
    let parts: Vec<&str> = domain.split('.').collect();

    if parts.len() <= 2 {
        return domain;
    }

    let last_two = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);

    // Compound TLDs need three labels for the apex
    let compound_tlds = ["co.uk", "co.au", "com.au", "co.nz", "co.jp", "co.kr",
                         "com.br", "com.mx", "com.cn", "org.uk", "net.au"];

    if compound_tlds.contains(&last_two.as_str()) {
        if parts.len() > 3 {
            format!("{}.{}", parts[parts.len() - 3], last_two)
        } else {
            domain
        }
    } else {
        last_two
    }
}

/// Extract the domain portion of an email address, lowercased
pub fn email_domain(email: &str) -> Option<String> {
    let at = email.rfind('@')?;
    let domain = &email[at + 1..];
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_lowercase())
}

/// Check whether an email's domain belongs to the allowed-domain set.
/// Subdomains of an allowed domain are accepted (jane@mail.acme.com is
/// valid when acme.com is allowed).
pub fn email_domain_allowed(email: &str, allowed: &[String]) -> bool {
    let Some(domain) = email_domain(email) else {
        return false;
    };
    let base = extract_base_domain(&domain);
    allowed.iter().any(|a| {
        let a = a.to_lowercase();
        domain == a || base == extract_base_domain(&a)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_website() {
        assert_eq!(normalize_website("https://www.acme.com"), "acme.com");
        assert_eq!(normalize_website("http://acme.com/about"), "acme.com");
        assert_eq!(normalize_website("ACME.com"), "acme.com");
        assert_eq!(normalize_website("  www.acme.co.uk  "), "acme.co.uk");
        assert_eq!(normalize_website("acme.com:8080/path"), "acme.com");
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("acme.com"));
        assert!(is_valid_domain("sub.acme.com"));
        assert!(!is_valid_domain("acme"));
        assert!(!is_valid_domain("http://acme.com"));
        assert!(!is_valid_domain(".acme.com"));
        assert!(!is_valid_domain("acme..com"));
    }

    #[test]
    fn test_extract_base_domain() {
        assert_eq!(extract_base_domain("acme.com"), "acme.com");
        assert_eq!(extract_base_domain("finance.acme.com"), "acme.com");
        assert_eq!(extract_base_domain("mail.acme.co.uk"), "acme.co.uk");
        assert_eq!(extract_base_domain("acme.co.uk"), "acme.co.uk");
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("jane@acme.com"), Some("acme.com".to_string()));
        assert_eq!(email_domain("jane@ACME.com"), Some("acme.com".to_string()));
        assert_eq!(email_domain("not-an-email"), None);
        assert_eq!(email_domain("trailing@"), None);
    }

    #[test]
    fn test_email_domain_allowed() {
        let allowed = vec!["acme.com".to_string(), "parentco.com".to_string()];
        assert!(email_domain_allowed("jane@acme.com", &allowed));
        assert!(email_domain_allowed("jane@mail.acme.com", &allowed));
        assert!(email_domain_allowed("jane@parentco.com", &allowed));
        assert!(!email_domain_allowed("jane@unrelated.com", &allowed));
        assert!(!email_domain_allowed("not-an-email", &allowed));
    }
}
