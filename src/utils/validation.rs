use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

pub fn validate_password(password: &str) -> bool {
    password.len() >= 8
}

pub fn validate_display_name(name: &str) -> bool {
    !name.trim().is_empty()
}

pub fn validate_rating(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// Lowercased, hyphen-separated form of a tour name, for URLs.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn generate_reset_token() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Tokens are stored hashed; only the digest ever touches the database.
pub fn hash_reset_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_email() {
        assert!(validate_email("hiker@example.com"));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("missing@tld"));
    }

    #[test]
    fn password_needs_eight_chars() {
        assert!(validate_password("longenough"));
        assert!(!validate_password("short"));
    }

    #[test]
    fn display_name_must_have_substance() {
        assert!(validate_display_name("Aarav Lindqvist"));
        assert!(!validate_display_name(""));
        assert!(!validate_display_name("   "));
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1));
        assert!(validate_rating(5));
        assert!(!validate_rating(0));
        assert!(!validate_rating(6));
    }

    #[test]
    fn slugify_tour_names() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
        assert_eq!(slugify("  Sea   Explorer! "), "sea-explorer");
    }

    #[test]
    fn reset_token_digest_is_stable() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_reset_token(&token), hash_reset_token(&token));
        assert_ne!(hash_reset_token(&token), token);
    }
}
