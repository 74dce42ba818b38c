use rustc_hash::FxHashMap;
use shadowscope::config::CoreConfig;
use shadowscope::domains::DomainClassifier;

fn classifier() -> DomainClassifier {
    DomainClassifier::new(&CoreConfig::default())
}

fn meta(key: &str, value: &str) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    map.insert(key.to_string(), value.to_string());
    map
}

#[test]
fn exact_ai_domains_match() {
    let classifier = classifier();
    assert!(classifier.is_ai_domain("openai.com"));
    assert!(classifier.is_ai_domain("chatgpt.com"));
    assert!(classifier.is_ai_domain("claude.ai"));
    assert!(classifier.is_ai_domain("huggingface.co"));
}

#[test]
fn subdomains_match_via_parent_suffixes() {
    let classifier = classifier();
    // Two-label parent.
    assert!(classifier.is_ai_domain("cdn.openai.com"));
    assert!(classifier.is_ai_domain("x.y.openai.com"));
    // Three-label parent (api.openai.com is in the set).
    assert!(classifier.is_ai_domain("eu.api.openai.com"));
}

#[test]
fn lookups_are_case_insensitive_and_trimmed() {
    let classifier = classifier();
    assert!(classifier.is_ai_domain("ChatGPT.com"));
    assert!(classifier.is_ai_domain("  openai.com  "));
}

#[test]
fn non_ai_domains_do_not_match() {
    let classifier = classifier();
    assert!(!classifier.is_ai_domain(""));
    assert!(!classifier.is_ai_domain("example.com"));
    assert!(!classifier.is_ai_domain("github.com"));
    // Suffix matching must not turn "notopenai.com" into a hit.
    assert!(!classifier.is_ai_domain("notopenai.com"));
}

#[test]
fn rfc1918_addresses_are_internal() {
    let classifier = classifier();
    assert!(classifier.is_internal("192.168.1.10"));
    assert!(classifier.is_internal("10.0.0.1"));
    assert!(classifier.is_internal("172.16.44.2"));
    assert!(classifier.is_internal("172.31.255.1"));

    assert!(!classifier.is_internal("8.8.8.8"));
    assert!(!classifier.is_internal("172.32.0.1"));
    assert!(!classifier.is_internal("chatgpt.com"));
}

#[test]
fn corporate_traffic_rules() {
    let classifier = classifier();
    let empty = FxHashMap::default();

    // Private destinations are always corporate.
    assert!(classifier.is_corporate_traffic("192.168.1.100", &empty));

    // Personal hosts are never corporate.
    assert!(!classifier.is_corporate_traffic("52.44.1.1", &meta("host", "netflix.com")));
    assert!(!classifier.is_corporate_traffic("52.44.1.1", &meta("sni", "youtube.com")));

    // Sanctioned SaaS always is.
    assert!(classifier.is_corporate_traffic("140.82.112.3", &meta("host", "github.com")));

    // Unknown external defaults to monitored.
    assert!(classifier.is_corporate_traffic("203.0.113.7", &empty));
}

#[test]
fn monitor_unknown_knob_flips_the_default() {
    let strict = DomainClassifier::new(&CoreConfig::default().with_monitor_unknown(false));
    let empty = FxHashMap::default();

    assert!(!strict.is_corporate_traffic("203.0.113.7", &empty));
    // Explicit categories still apply.
    assert!(strict.is_corporate_traffic("140.82.112.3", &meta("host", "github.com")));
    assert!(strict.is_corporate_traffic("192.168.1.5", &empty));
}

#[test]
fn should_capture_honors_privacy_mode() {
    let private_on = classifier();
    assert!(!private_on.should_capture("52.44.1.1", &meta("host", "netflix.com")));
    assert!(private_on.should_capture("52.44.1.1", &meta("host", "github.com")));

    let private_off = DomainClassifier::new(&CoreConfig::default().with_privacy_mode(false));
    assert!(private_off.should_capture("52.44.1.1", &meta("host", "netflix.com")));
}
