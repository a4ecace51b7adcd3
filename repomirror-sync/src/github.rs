//! Source listing over the GitHub REST API.

use std::thread;
use std::time::Duration;

use repomirror_core::{RemoteRepository, Settings, Token};

use crate::http::{ApiRequest, Transport};

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Enumerates the repositories to mirror.
pub trait RepositorySource {
    /// Fully materialized listing. Never fails: an API error ends pagination
    /// and whatever was gathered so far is returned.
    fn list_repositories(&self) -> Vec<RemoteRepository>;
}

pub struct GitHubClient<T: Transport> {
    transport: T,
    api_url: String,
    token: Token,
    per_page: u32,
    page_delay: Duration,
}

impl<T: Transport> GitHubClient<T> {
    pub fn new(
        transport: T,
        api_url: impl Into<String>,
        token: Token,
        per_page: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            transport,
            api_url: api_url.into(),
            token,
            per_page,
            page_delay,
        }
    }

    pub fn from_settings(settings: &Settings, transport: T) -> Self {
        Self::new(
            transport,
            &settings.github_api_url,
            settings.github_token.clone(),
            settings.per_page,
            settings.page_delay,
        )
    }

    fn page_request(&self, page: u32) -> ApiRequest {
        let url = format!(
            "{}/user/repos?per_page={}&page={}&affiliation=owner,member",
            self.api_url, self.per_page, page
        );
        ApiRequest::get(url)
            .header("Authorization", format!("Bearer {}", self.token.expose()))
            .header("Accept", ACCEPT)
    }
}

impl<T: Transport> RepositorySource for GitHubClient<T> {
    fn list_repositories(&self) -> Vec<RemoteRepository> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let response = match self.transport.send(&self.page_request(page)) {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(page, error = %err, "GitHub API request failed");
                    break;
                }
            };
            if response.status != 200 {
                tracing::error!(
                    page,
                    status = response.status,
                    body = %response.snippet(),
                    "GitHub API error"
                );
                break;
            }

            let batch: Vec<RemoteRepository> = match response.json() {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(page, error = %err, "unparsable GitHub repository page");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            tracing::debug!(page, count = batch.len(), "fetched repository page");
            repos.extend(batch);
            page += 1;
            if !self.page_delay.is_zero() {
                thread::sleep(self.page_delay);
            }
        }

        tracing::info!("found {} GitHub repositories", repos.len());
        repos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::test_support::{ok, ScriptedTransport};

    fn client(transport: &ScriptedTransport) -> GitHubClient<&ScriptedTransport> {
        GitHubClient::new(
            transport,
            "https://api.github.test",
            Token::new("ghp"),
            2,
            Duration::ZERO,
        )
    }

    fn page(names: &[&str]) -> String {
        let items: Vec<String> = names
            .iter()
            .map(|n| {
                let url = format!("https://github.com/octo/{n}.git");
                format!(r#"{{"name":"{n}","clone_url":"{url}","private":false}}"#)
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    #[test]
    fn paginates_until_empty_page() {
        let transport = ScriptedTransport::new(vec![
            ok(200, &page(&["a", "b"])),
            ok(200, &page(&["c"])),
            ok(200, "[]"),
        ]);

        let repos = client(&transport).list_repositories();

        let names: Vec<_> = repos.iter().map(|r| r.name.0.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let urls = transport.urls();
        assert_eq!(urls.len(), 3);
        assert_eq!(
            urls[0],
            "https://api.github.test/user/repos?per_page=2&page=1&affiliation=owner,member"
        );
        assert!(urls[2].contains("page=3"));
    }

    #[test]
    fn sends_token_and_accept_headers() {
        let transport = ScriptedTransport::new(vec![ok(200, "[]")]);
        client(&transport).list_repositories();
        let requests = transport.requests.borrow();
        assert!(requests[0]
            .headers
            .contains(&("Authorization", "Bearer ghp".to_string())));
        assert!(requests[0].headers.contains(&("Accept", ACCEPT.to_string())));
    }

    #[test]
    fn non_200_returns_partial_listing() {
        let transport = ScriptedTransport::new(vec![
            ok(200, &page(&["a", "b"])),
            ok(502, "bad gateway"),
        ]);

        let repos = client(&transport).list_repositories();

        assert_eq!(repos.len(), 2);
        assert_eq!(transport.urls().len(), 2, "must stop after the error page");
    }

    #[test]
    fn first_page_error_returns_empty() {
        let transport =
            ScriptedTransport::new(vec![ok(401, r#"{"message":"Bad credentials"}"#)]);
        assert!(client(&transport).list_repositories().is_empty());
    }

    #[test]
    fn transport_failure_returns_partial_listing() {
        let transport = ScriptedTransport::new(vec![
            ok(200, &page(&["a"])),
            Err(TransportError::Request {
                url: "https://api.github.test".into(),
                message: "timed out".into(),
            }),
        ]);
        let repos = client(&transport).list_repositories();
        assert_eq!(repos.len(), 1);
    }

    #[test]
    fn garbage_body_stops_pagination() {
        let transport = ScriptedTransport::new(vec![ok(200, "<html>")]);
        assert!(client(&transport).list_repositories().is_empty());
    }

    #[test]
    fn entry_without_private_flag_stops_pagination() {
        let transport = ScriptedTransport::new(vec![
            ok(200, &page(&["a"])),
            ok(200, r#"[{"name":"b","clone_url":"https://github.com/octo/b.git"}]"#),
            ok(200, &page(&["c"])),
        ]);

        let repos = client(&transport).list_repositories();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name.0, "a");
        assert_eq!(transport.urls().len(), 2);
    }
}
