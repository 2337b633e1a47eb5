//! Social share links

use std::fmt;
use std::str::FromStr;
use urlencoding::encode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareProvider {
    Twitter,
    Facebook,
    Email,
    Telegram,
    Linkedin,
    Reddit,
}

impl ShareProvider {
    pub const ALL: [ShareProvider; 6] = [
        ShareProvider::Twitter,
        ShareProvider::Facebook,
        ShareProvider::Email,
        ShareProvider::Telegram,
        ShareProvider::Linkedin,
        ShareProvider::Reddit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShareProvider::Twitter => "twitter",
            ShareProvider::Facebook => "facebook",
            ShareProvider::Email => "email",
            ShareProvider::Telegram => "telegram",
            ShareProvider::Linkedin => "linkedin",
            ShareProvider::Reddit => "reddit",
        }
    }

    /// Link that shares `article_url` under `title`
    pub fn link(self, article_url: &str, title: &str) -> String {
        let url = encode(article_url);
        let text = encode(title);
        match self {
            ShareProvider::Twitter => {
                format!("https://twitter.com/intent/tweet?text={}%20{}", text, url)
            }
            ShareProvider::Facebook => {
                format!("https://www.facebook.com/sharer/sharer.php?u={}", url)
            }
            ShareProvider::Email => format!("mailto:?subject={}&body={}", text, url),
            ShareProvider::Telegram => format!("https://t.me/share/url?url={}&text={}", url, text),
            ShareProvider::Linkedin => format!(
                "https://www.linkedin.com/shareArticle?mini=true&url={}&title={}",
                url, text
            ),
            ShareProvider::Reddit => format!("https://www.reddit.com/submit?url={}&title={}", url, text),
        }
    }
}

impl fmt::Display for ShareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown share provider: {}", s))
    }
}

/// Message returned for an unknown provider
pub fn invalid_provider_message() -> String {
    let names: Vec<&str> = ShareProvider::ALL.iter().map(|p| p.as_str()).collect();
    format!("Please select a valid provider - {}", names.join(", "))
}

/// Title used in every share: "{title} by {author}"
pub fn share_title(title: &str, author: &str) -> String {
    format!("{} by {}", title, author)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:8080/articles/hello-world";

    #[test]
    fn test_parse_providers() {
        for provider in ShareProvider::ALL {
            assert_eq!(provider.as_str().parse::<ShareProvider>().unwrap(), provider);
        }
        assert!("myspace".parse::<ShareProvider>().is_err());
        assert!("Twitter".parse::<ShareProvider>().is_err());
    }

    #[test]
    fn test_links_embed_encoded_url_and_title() {
        let title = share_title("Hello World", "ada");
        for provider in ShareProvider::ALL {
            let link = provider.link(URL, &title);
            assert!(
                link.contains("http%3A%2F%2Flocalhost%3A8080%2Farticles%2Fhello-world"),
                "{} link lacks url: {}",
                provider,
                link
            );
        }
        let tweet = ShareProvider::Twitter.link(URL, &title);
        assert!(tweet.starts_with("https://twitter.com/intent/tweet?text=Hello%20World%20by%20ada"));
        assert!(ShareProvider::Email.link(URL, &title).starts_with("mailto:"));
    }

    #[test]
    fn test_invalid_provider_message() {
        assert_eq!(
            invalid_provider_message(),
            "Please select a valid provider - twitter, facebook, email, telegram, linkedin, reddit"
        );
    }
}
