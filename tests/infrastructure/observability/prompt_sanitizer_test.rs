use recipe_scribe::infrastructure::observability::sanitize_prompt;

#[test]
fn given_empty_prompt_when_sanitizing_then_returns_empty_marker() {
    assert_eq!(sanitize_prompt(""), "[EMPTY]");
    assert_eq!(sanitize_prompt("   "), "[EMPTY]");
}

#[test]
fn given_short_prompt_when_sanitizing_then_returns_unchanged() {
    let prompt = "Extract the recipe from this transcript";
    assert_eq!(sanitize_prompt(prompt), prompt);
}

#[test]
fn given_long_transcript_when_sanitizing_then_truncates_with_length() {
    let prompt = "a".repeat(150);
    let result = sanitize_prompt(&prompt);
    assert!(result.contains("... (150 chars total)"));
    assert!(result.starts_with(&"a".repeat(100)));
}

#[test]
fn given_multibyte_transcript_when_sanitizing_then_cuts_on_char_boundary() {
    let prompt = "é".repeat(120);
    let result = sanitize_prompt(&prompt);
    assert!(result.starts_with(&"é".repeat(100)));
    assert!(result.contains("(120 chars total)"));
}

#[test]
fn given_bearer_token_when_sanitizing_then_redacts_token() {
    let prompt = "Authorization: Bearer sk-abc123xyz";
    let result = sanitize_prompt(prompt);
    assert!(result.contains("Bearer [REDACTED]"));
    assert!(!result.contains("sk-abc123xyz"));
}

#[test]
fn given_api_key_header_when_sanitizing_then_redacts_key() {
    let prompt = "api-key: 0123abcd and then the recipe";
    let result = sanitize_prompt(prompt);
    assert!(result.contains("api-key: [REDACTED]"));
    assert!(!result.contains("0123abcd"));
}

#[test]
fn given_repeated_secrets_when_sanitizing_then_redacts_each() {
    let prompt = "token=first then token=second";
    let result = sanitize_prompt(prompt);
    assert!(!result.contains("first"));
    assert!(!result.contains("second"));
    assert_eq!(result.matches("token=[REDACTED]").count(), 2);
}

#[test]
fn given_password_when_sanitizing_then_redacts_password() {
    let prompt = "Login with password=hunter2";
    let result = sanitize_prompt(prompt);
    assert!(result.contains("password=[REDACTED]"));
    assert!(!result.contains("hunter2"));
}

#[test]
fn given_whitespace_padded_prompt_when_sanitizing_then_trims() {
    assert_eq!(sanitize_prompt("  Hello world  "), "Hello world");
}
