use recipe_scribe::domain::{VideoUrl, VideoUrlError};

#[test]
fn given_youtube_link_when_parsing_then_keeps_host() {
    let url = VideoUrl::parse("https://www.youtube.com/watch?v=abc123").unwrap();
    assert_eq!(url.host(), "www.youtube.com");
    assert_eq!(url.as_str(), "https://www.youtube.com/watch?v=abc123");
}

#[test]
fn given_padded_link_when_parsing_then_trims_whitespace() {
    let url = VideoUrl::parse("  https://youtu.be/abc123 \n").unwrap();
    assert_eq!(url.to_string(), "https://youtu.be/abc123");
}

#[test]
fn given_plain_http_link_when_parsing_then_accepts_it() {
    assert!(VideoUrl::parse("http://vimeo.com/12345").is_ok());
}

#[test]
fn given_blank_input_when_parsing_then_reports_empty() {
    assert_eq!(VideoUrl::parse("   "), Err(VideoUrlError::Empty));
}

#[test]
fn given_file_scheme_when_parsing_then_rejects_it() {
    assert_eq!(
        VideoUrl::parse("file:///etc/passwd"),
        Err(VideoUrlError::UnsupportedScheme("file".to_string()))
    );
}

#[test]
fn given_relative_path_when_parsing_then_reports_invalid() {
    assert!(matches!(
        VideoUrl::parse("watch?v=abc"),
        Err(VideoUrlError::Invalid(_))
    ));
}

#[test]
fn given_option_like_text_when_parsing_then_rejects_it() {
    assert!(VideoUrl::parse("--exec rm").is_err());
}
