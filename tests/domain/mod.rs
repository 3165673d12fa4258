mod video_url_test;
