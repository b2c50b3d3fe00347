use crate::models::credits::CreditPackage;

/// Credit bundles offered on the purchase page.
pub const CREDIT_PACKAGES: &[CreditPackage] = &[
    CreditPackage {
        id: "starter",
        credits: 100,
        price: 49,
        currency: "INR",
        validity_days: 30,
    },
    CreditPackage {
        id: "professional",
        credits: 500,
        price: 199,
        currency: "INR",
        validity_days: 60,
    },
    CreditPackage {
        id: "enterprise",
        credits: 1000,
        price: 299,
        currency: "INR",
        validity_days: 90,
    },
];

pub fn find_package(id: &str) -> Option<&'static CreditPackage> {
    CREDIT_PACKAGES.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_package() {
        let pkg = find_package("professional").unwrap();
        assert_eq!(pkg.credits, 500);
        assert_eq!(pkg.validity_days, 60);
        assert_eq!(pkg.price, 199);
    }

    #[test]
    fn test_packages_serialize_with_price() {
        let json = serde_json::to_value(CREDIT_PACKAGES).unwrap();
        assert_eq!(json[0]["id"], "starter");
        assert_eq!(json[0]["price"], 49);
        assert_eq!(json[0]["currency"], "INR");
        assert_eq!(json[2]["price"], 299);
    }

    #[test]
    fn test_unknown_package_is_none() {
        assert!(find_package("platinum").is_none());
    }
}
