mod yt_dlp_fetcher;

pub use yt_dlp_fetcher::YtDlpFetcher;
