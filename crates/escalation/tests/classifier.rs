//! Routing rules and dedup behaviour through the public API.

use escalation_monitor::{classify, SeenSet, ServiceTag, Ticket};

#[test]
fn test_mongo_platform_always_routes_to_atlas() {
    let titles = [
        "Snowflake warehouse down",
        "Salesforce permission set missing",
        "Nothing relevant here",
        "",
    ];
    for platform in ["MongoDB", "mongo", "MONGODB Atlas"] {
        for title in titles {
            let ticket = Ticket::new("#1", title)
                .with_platform(platform)
                .with_description("sfdc snowflake");
            assert_eq!(classify(&ticket), ServiceTag::Atlas, "{platform} / {title}");
        }
    }
}

#[test]
fn test_snowflake_in_title_without_platform() {
    for title in ["Snowflake query hangs", "SNOWFLAKE role grant", "issue with snowFlake"] {
        assert_eq!(classify(&Ticket::new("#1", title)), ServiceTag::Snowflake);
    }
}

#[test]
fn test_description_is_last_resort() {
    let ticket = Ticket::new("#1", "Customer reports a problem")
        .with_description("Permission set is not applied after sync");
    assert_eq!(classify(&ticket), ServiceTag::Salesforce);

    let ticket = Ticket::new("#2", "Customer reports a problem").with_description("Agent offline");
    assert_eq!(classify(&ticket), ServiceTag::Unknown);
}

#[test]
fn test_mark_seen_is_idempotent() {
    let mut seen = SeenSet::new();
    assert!(seen.is_new("#0934994"));
    seen.mark_seen("#0934994");
    seen.mark_seen("#0934994");
    assert!(!seen.is_new("#0934994"));
    assert_eq!(seen.len(), 1);
}
