//! HTML rendering for the front page

use once_cell::sync::Lazy;
use regex::Regex;

use clay_common::dates::{now_naive, relative_timesince};
use clay_common::text::{escape_html, strip_tags, truncate_words};
use clay_syncr::flickr::Photo;

use crate::sources::{BlogEntry, ShownTweet};

/// Photos per row in the front page grid
pub const NUM_PHOTOS_PER_ROW: usize = 7;

/// Words of a blog summary shown under its title
const SUMMARY_WORDS: usize = 40;

/// Completions of "Samuel Clay ..." shown in the header
pub const ISA_QUOTES: [&str; 11] = [
    "is up on a hill in San Francisco.",
    "is eager to hear what you think.",
    "is modern day geekery.",
    "is going about it all wrong.",
    "is writing code. Right. Now.",
    "is making out with his dog again.",
    "is on a tea buying spree.",
    "is another former Clevelander.",
    "is in his element.",
    "is randomizing fields.",
    "is driving with the top down.",
];

/// Split `items` into consecutive rows of `n`; the last row may be short
pub fn chunks<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    if n == 0 {
        return Vec::new();
    }
    items.chunks(n).map(<[T]>::to_vec).collect()
}

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<start>.?)#(?P<hashtag>[A-Za-z_]+)(?P<end>.?)").expect("hashtag regex is valid")
});

static USER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<start>.?)@(?P<user>[A-Za-z0-9_]+)(?P<end>.?)").expect("user regex is valid")
});

/// Link `#hashtags` to a Twitter search and `@users` to their profiles
pub fn twitterfy(tweet: &str) -> String {
    let text = HASHTAG_RE.replace_all(
        tweet,
        r##"${start}#<a href="http://search.twitter.com/search?q=${hashtag}"  title="#${hashtag} search Twitter">${hashtag}</a>${end}"##,
    );
    USER_RE
        .replace_all(
            &text,
            r##"${start}@<a href="http://twitter.com/${user}"  title="#${user} on Twitter">${user}</a>${end}"##,
        )
        .into_owned()
}

fn render_blog(entries: &[BlogEntry]) -> String {
    let now = now_naive();
    entries
        .iter()
        .map(|entry| {
            let when = entry
                .updated
                .map(|d| format!(r#"<span class="date">{} ago</span>"#, relative_timesince(d, now)))
                .unwrap_or_default();
            format!(
                r#"<li class="entry"><a href="{}">{}</a> {}<p>{}</p></li>"#,
                escape_html(&entry.link),
                escape_html(&entry.title),
                when,
                escape_html(&truncate_words(&strip_tags(&entry.summary), SUMMARY_WORDS))
            )
        })
        .collect()
}

fn render_tweets(tweets: &[ShownTweet]) -> String {
    tweets
        .iter()
        .map(|tweet| {
            format!(
                r#"<li class="tweet">{} <span class="date">{}</span></li>"#,
                twitterfy(&escape_html(&tweet.text)),
                escape_html(&tweet.relative_created_at)
            )
        })
        .collect()
}

/// Rows of square thumbnails; each row's first and last cells are marked
fn render_photos(photos: &[Photo]) -> String {
    chunks(photos, NUM_PHOTOS_PER_ROW)
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .enumerate()
                .map(|(i, photo)| {
                    let mut class = String::from("photo");
                    if i == 0 {
                        class.push_str(" first");
                    }
                    if i + 1 == row.len() {
                        class.push_str(" last");
                    }
                    format!(
                        r#"<div class="{}"><a href="{}"><img src="{}" alt="{}" width="75" height="75"></a></div>"#,
                        class,
                        escape_html(&photo.photopage_url),
                        escape_html(&photo.square_url()),
                        escape_html(&photo.title)
                    )
                })
                .collect();
            format!(r#"<div class="photo-row">{}</div>"#, cells)
        })
        .collect()
}

/// The complete front page
pub fn index_page(
    blog: &[BlogEntry],
    tweets: &[ShownTweet],
    photos: &[Photo],
    isa_quote: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Samuel Clay</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
    <h1>Samuel Clay <span class="isa">{isa}</span></h1>
    <div id="blog"><h2>Blog</h2><ul>{blog}</ul></div>
    <div id="twitter"><h2>Twitter</h2><ul>{tweets}</ul></div>
    <div id="photos"><h2>Photos</h2>{photos}</div>
</body>
</html>
"#,
        isa = escape_html(isa_quote),
        blog = render_blog(blog),
        tweets = render_tweets(tweets),
        photos = render_photos(photos),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks() {
        let items: Vec<i32> = (1..=16).collect();
        let rows = chunks(&items, NUM_PHOTOS_PER_ROW);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(rows[2], vec![15, 16]);
        assert!(chunks::<i32>(&[], 7).is_empty());
    }

    #[test]
    fn test_twitterfy_links_hashtags_and_users() {
        let html = twitterfy("Riding with @conesus today #bikes");
        assert!(html.contains(r#"@<a href="http://twitter.com/conesus""#));
        assert!(html.contains(r#"#<a href="http://search.twitter.com/search?q=bikes""#));
        assert!(html.starts_with("Riding with "));
    }

    #[test]
    fn test_twitterfy_link_titles() {
        assert_eq!(
            twitterfy("#bikes"),
            r##"#<a href="http://search.twitter.com/search?q=bikes"  title="#bikes search Twitter">bikes</a>"##
        );
        assert_eq!(
            twitterfy("@conesus"),
            r##"@<a href="http://twitter.com/conesus"  title="#conesus on Twitter">conesus</a>"##
        );
    }

    #[test]
    fn test_twitterfy_plain_text_unchanged() {
        assert_eq!(twitterfy("No links here."), "No links here.");
    }

    #[test]
    fn test_index_page_escapes_tweets() {
        let tweets = vec![ShownTweet {
            relative_created_at: "2 hours ago".to_string(),
            text: "<script> & #fun".to_string(),
        }];
        let html = index_page(&[], &tweets, &[], ISA_QUOTES[0]);
        assert!(html.contains("&lt;script&gt; &amp; #<a href"));
        assert!(html.contains("is up on a hill in San Francisco."));
    }
}
