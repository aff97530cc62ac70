pub const OWNER_BUCKET: &str = "owner-images";
pub const PRODUCT_BUCKET: &str = "product-images";

const FALLBACK_SERVICE: &str = "https://ui-avatars.com/api";

/// Lower-cased, spaces replaced with hyphens; how image objects are keyed in
/// the storage buckets.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn owner_image_url(base_url: &str, owner: &str) -> String {
    image_url(base_url, OWNER_BUCKET, owner)
}

pub fn product_image_url(base_url: &str, product: &str) -> String {
    image_url(base_url, PRODUCT_BUCKET, product)
}

fn image_url(base_url: &str, bucket: &str, name: &str) -> String {
    format!(
        "{}/{}/{}.png",
        base_url.trim_end_matches('/'),
        bucket,
        normalize_name(name)
    )
}

/// Generated-avatar URL used when the bucket image fails to load.
pub fn fallback_image_url(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect();
    format!("{}/?name={}", FALLBACK_SERVICE, initials)
}

#[cfg(test)]
mod tests {
    use super::{fallback_image_url, normalize_name, owner_image_url, product_image_url};

    #[test]
    fn names_are_lowercased_and_hyphenated() {
        assert_eq!(normalize_name("AI Caller"), "ai-caller");
        assert_eq!(normalize_name("Hasan"), "hasan");
        assert_eq!(normalize_name("  CRMagic  "), "crmagic");
    }

    #[test]
    fn urls_target_the_right_bucket() {
        let base = "https://storage.dealdesk.local/";
        assert_eq!(
            owner_image_url(base, "Hasan"),
            "https://storage.dealdesk.local/owner-images/hasan.png"
        );
        assert_eq!(
            product_image_url(base, "AI Caller"),
            "https://storage.dealdesk.local/product-images/ai-caller.png"
        );
    }

    #[test]
    fn fallback_uses_initials() {
        assert_eq!(fallback_image_url("Acme Corp"), "https://ui-avatars.com/api/?name=AC");
    }
}
