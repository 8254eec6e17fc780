use self::repos::*;
use super::{
    error::Error,
    responses::{ApiMessage, RepositoryDescriptor},
};
use http::{
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
    HeaderMap, HeaderValue,
};
use reqwest::{Client, ClientBuilder, Response};
use std::{convert::TryInto, result::Result};
use tracing::debug;
use url::Url;

type ClientResult<T> = Result<T, Error>;

pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Fixed listing page size, the maximum the API accepts.
const PER_PAGE: &str = "100";

/// [GitHub REST authentication methods](https://docs.github.com/en/rest/overview/authenticating-to-the-rest-api).
pub trait Authentication {
    /// Encode authentication into HTTP authorization header.
    fn to_authz_value(&self) -> String;
}

#[derive(Debug)]
pub struct GhClient {
    base_url: Url,
    http: Client,
    authenticated: bool,
}

impl GhClient {
    pub fn new(
        base_url: impl Into<Option<Url>>,
        token: Option<&dyn Authentication>,
    ) -> ClientResult<Self> {
        let mut base_url: Url =
            base_url.into().map(Result::Ok).unwrap_or_else(|| DEFAULT_API_URL.parse())?;
        // joined paths are relative, keep any prefix such as `/api/v3`
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let headers = {
            let mut headers = HeaderMap::new();

            let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            headers.insert(USER_AGENT, HeaderValue::from_str(&user_agent)?);

            if let Some(token) = token {
                let mut authorization: HeaderValue = token.to_authz_value().try_into()?;
                authorization.set_sensitive(true);
                headers.insert(AUTHORIZATION, authorization);
            }

            headers.insert(ACCEPT, "application/vnd.github+json".try_into()?);
            headers.insert("x-github-api-version", "2022-11-28".try_into()?);

            headers
        };

        let http = ClientBuilder::new().default_headers(headers).build()?;

        let client = GhClient { base_url, http, authenticated: token.is_some() };
        debug!(?client);

        Ok(client)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn build_url(&self, path: &str) -> ClientResult<Url> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        Ok(url)
    }

    pub fn repos(&self) -> GhRepos<'_> {
        GhRepos { client: self }
    }
}

mod repos {
    use super::*;
    use crate::github::{requests::CreateRepository, responses::CreatedRepository};
    use futures::{stream, StreamExt, TryStream, TryStreamExt};
    use serde::Deserialize;

    #[derive(Debug)]
    /// GitHub's repository resource.
    ///
    /// [GitHub Docs].
    ///
    /// [GitHub Docs]: https://docs.github.com/en/rest/repos/repos
    pub struct GhRepos<'c> {
        pub client: &'c GhClient,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum PageCursor {
        Page(u32),
        End,
    }

    impl Default for PageCursor {
        fn default() -> Self {
            Self::Page(1)
        }
    }

    /// A listing page body. The API may answer with a message object instead of an array.
    #[derive(Deserialize, Debug)]
    #[serde(untagged)]
    enum ListingBody {
        Items(Vec<RepositoryDescriptor>),
        Message(ApiMessage),
    }

    impl GhRepos<'_> {
        /// Lists every repository of `owner`, page by page.
        ///
        /// Authenticated clients list the repositories visible to the credential
        /// ([GitHub Docs][authenticated]), anonymous clients the public repositories of `owner`
        /// ([GitHub Docs][public]). Either way only repositories owned by `owner` are yielded.
        ///
        /// Pages are requested one at a time, starting at 1, until the API returns an empty page.
        /// The first failing page ends the stream with [`Error::FetchFailed`].
        ///
        /// [authenticated]: https://docs.github.com/en/rest/repos/repos#list-repositories-for-the-authenticated-user
        /// [public]: https://docs.github.com/en/rest/repos/repos#list-repositories-for-a-user
        pub fn list_repositories<'a>(
            &'a self,
            owner: &'a str,
        ) -> impl TryStream<Ok = RepositoryDescriptor, Error = Error> + 'a {
            stream::try_unfold(PageCursor::default(), move |cursor| async move {
                let page_num = match cursor {
                    PageCursor::Page(x) => x,
                    PageCursor::End => {
                        return Result::<_, Error>::Ok(None);
                    }
                };
                let items = self.get_repositories_page(owner, page_num).await?;
                // an empty page marks the end of the listing
                let cursor =
                    if items.is_empty() { PageCursor::End } else { PageCursor::Page(page_num + 1) };
                // `/user/repos` also lists repositories the credential reaches through other
                // accounts
                let items: Vec<_> = items.into_iter().filter(|x| x.is_owned_by(owner)).collect();
                Ok(Some((items, cursor)))
            })
            .map_ok(|items| stream::iter(items).map(Result::<_, Error>::Ok))
            .try_flatten()
        }

        /// Collects [`Self::list_repositories`], discarding everything on the first failed page.
        pub async fn fetch_all_repositories(
            &self,
            owner: &str,
        ) -> ClientResult<Vec<RepositoryDescriptor>> {
            let repos: Vec<_> = self.list_repositories(owner).try_collect().await?;
            debug!(owner, count = repos.len(), "fetched repositories");
            Ok(repos)
        }

        async fn get_repositories_page(
            &self,
            owner: &str,
            page_num: u32,
        ) -> ClientResult<Vec<RepositoryDescriptor>> {
            let fetch_failed = |status_or_message: String| Error::FetchFailed {
                page: page_num,
                status_or_message,
            };

            let path = if self.client.authenticated {
                "/user/repos".to_owned()
            } else {
                format!("/users/{owner}/repos")
            };
            let url = self.client.build_url(&path)?;

            let page = page_num.to_string();
            let request =
                self.client.http.get(url).query(&[("page", page.as_str()), ("per_page", PER_PAGE)]);
            debug!(?request, "sending request");

            let response = request.send().await.map_err(|x| fetch_failed(x.to_string()))?;
            debug!(?response, "received response");
            let response = check_status(response).await.map_err(|x| fetch_failed(x.to_string()))?;

            let body: ListingBody =
                response.json().await.map_err(|x| fetch_failed(x.to_string()))?;
            match body {
                ListingBody::Items(items) => {
                    debug!(page_num, count = items.len(), "received page");
                    Ok(items)
                }
                ListingBody::Message(ApiMessage { message, .. }) => Err(fetch_failed(message)),
            }
        }

        /// Create a repository for the authenticated user.
        ///
        /// [GitHub Docs].
        ///
        /// [GitHub Docs]: https://docs.github.com/en/rest/repos/repos#create-a-repository-for-the-authenticated-user
        pub async fn create_repository(
            &self,
            fields: &CreateRepository,
        ) -> ClientResult<CreatedRepository> {
            if !self.client.authenticated {
                return Err(Error::Unauthenticated);
            }
            let url = self.client.build_url("/user/repos")?;
            let request = self.client.http.post(url).json(fields);
            debug!(?request, "sending request");
            let response = request.send().await?;
            debug!(?response, "received response");
            let response = check_status(response).await?;
            let response_body: CreatedRepository = response.json().await?;
            debug!(?response_body, "response body");
            Ok(response_body)
        }

        /// Delete a repository.
        ///
        /// [GitHub Docs].
        ///
        /// [GitHub Docs]: https://docs.github.com/en/rest/repos/repos#delete-a-repository
        pub async fn delete_repository(&self, owner: &str, repo: &str) -> ClientResult<()> {
            if !self.client.authenticated {
                return Err(Error::Unauthenticated);
            }
            let url = self.client.build_url(&format!("/repos/{owner}/{repo}"))?;
            let request = self.client.http.delete(url);
            debug!(?request, "sending request");
            let response = request.send().await?;
            debug!(?response, "received response");
            check_status(response).await?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::github::BearerToken;
        use mockito::{Matcher, Server};
        use serde_json::json;
        use std::collections::HashSet;

        const TEST_TOKEN: BearerToken<'static> = BearerToken::new("t0k3n");

        fn page_query(page: u32) -> Matcher {
            Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), page.to_string()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ])
        }

        fn page_body(offset: usize, count: usize) -> String {
            let items: Vec<_> = (offset..offset + count)
                .map(|i| {
                    json!({
                        "name": format!("repo-{i}"),
                        "owner": { "login": "octocat" },
                        "clone_url": format!("https://github.com/octocat/repo-{i}.git"),
                        "ssh_url": format!("git@github.com:octocat/repo-{i}.git"),
                        "fork": i % 2 == 0,
                        "private": false,
                    })
                })
                .collect();
            serde_json::Value::Array(items).to_string()
        }

        fn client(server: &Server, token: Option<&dyn Authentication>) -> GhClient {
            let base_url: Url = server.url().parse().unwrap();
            GhClient::new(base_url, token).unwrap()
        }

        #[tokio::test]
        async fn test_fetch_all_pages_until_empty() {
            let mut server = Server::new_async().await;
            let mut mocks = Vec::new();
            let pages = [(0, 100), (100, 100), (200, 37), (237, 0)];
            for (page, (offset, count)) in pages.iter().enumerate() {
                let mock = server
                    .mock("GET", "/users/octocat/repos")
                    .match_query(page_query(page as u32 + 1))
                    .match_header("authorization", Matcher::Missing)
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(page_body(*offset, *count))
                    .expect(1)
                    .create_async()
                    .await;
                mocks.push(mock);
            }

            let client = client(&server, None);
            let repos = client.repos().fetch_all_repositories("octocat").await.unwrap();

            assert_eq!(repos.len(), 237);
            for mock in &mocks {
                mock.assert_async().await;
            }

            // order follows the api, no duplicates across page boundaries
            let names: Vec<_> = repos.iter().map(|x| x.name.as_str()).collect();
            assert_eq!(names.first(), Some(&"repo-0"));
            assert_eq!(names[100], "repo-100");
            assert_eq!(names.last(), Some(&"repo-236"));
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(unique.len(), names.len());
        }

        #[tokio::test]
        async fn test_fetch_aborts_on_failed_page() {
            let mut server = Server::new_async().await;
            let page_1 = server
                .mock("GET", "/users/octocat/repos")
                .match_query(page_query(1))
                .with_status(200)
                .with_body(page_body(0, 100))
                .create_async()
                .await;
            let page_2 = server
                .mock("GET", "/users/octocat/repos")
                .match_query(page_query(2))
                .with_status(500)
                .with_body(r#"{"message":"Server Error"}"#)
                .create_async()
                .await;
            let rest = server
                .mock("GET", "/users/octocat/repos")
                .match_query(Matcher::Regex("page=[34]".into()))
                .with_status(200)
                .with_body(page_body(0, 0))
                .expect(0)
                .create_async()
                .await;

            let client = client(&server, None);
            let err = client.repos().fetch_all_repositories("octocat").await.unwrap_err();

            match err {
                Error::FetchFailed { page, status_or_message } => {
                    assert_eq!(page, 2);
                    assert!(status_or_message.contains("500"), "{status_or_message}");
                    assert!(status_or_message.contains("Server Error"), "{status_or_message}");
                }
                other => panic!("unexpected error {other:?}"),
            }
            page_1.assert_async().await;
            page_2.assert_async().await;
            rest.assert_async().await;
        }

        #[tokio::test]
        async fn test_fetch_fails_on_message_payload() {
            let mut server = Server::new_async().await;
            let _page_1 = server
                .mock("GET", "/users/octocat/repos")
                .match_query(page_query(1))
                .with_status(200)
                .with_body(r#"{"message":"API rate limit exceeded"}"#)
                .create_async()
                .await;

            let client = client(&server, None);
            let err = client.repos().fetch_all_repositories("octocat").await.unwrap_err();

            assert!(matches!(
                err,
                Error::FetchFailed { page: 1, ref status_or_message }
                    if status_or_message == "API rate limit exceeded"
            ));
        }

        #[tokio::test]
        async fn test_authenticated_listing_uses_user_endpoint() {
            let mut server = Server::new_async().await;
            let page_1 = server
                .mock("GET", "/user/repos")
                .match_query(page_query(1))
                .match_header("authorization", "Bearer t0k3n")
                .with_status(200)
                .with_body(page_body(0, 3))
                .create_async()
                .await;
            let page_2 = server
                .mock("GET", "/user/repos")
                .match_query(page_query(2))
                .match_header("authorization", "Bearer t0k3n")
                .with_status(200)
                .with_body("[]")
                .create_async()
                .await;

            let client = client(&server, Some(&TEST_TOKEN));
            let repos = client.repos().fetch_all_repositories("octocat").await.unwrap();

            assert_eq!(repos.len(), 3);
            page_1.assert_async().await;
            page_2.assert_async().await;
        }

        #[tokio::test]
        async fn test_authenticated_listing_keeps_owned_repositories() {
            let mut server = Server::new_async().await;
            let entry = |owner: &str, name: &str| {
                json!({
                    "name": name,
                    "owner": { "login": owner },
                    "clone_url": format!("https://github.com/{owner}/{name}.git"),
                    "ssh_url": format!("git@github.com:{owner}/{name}.git"),
                    "fork": false,
                    "private": false,
                })
            };
            // the second page holds no octocat repository but is not the end of the listing
            let pages = [
                json!([entry("octocat", "tools"), entry("some-org", "tools")]),
                json!([entry("some-org", "infra")]),
                json!([entry("OctoCat", "dotfiles")]),
                json!([]),
            ];
            let mut mocks = Vec::new();
            for (page, body) in pages.iter().enumerate() {
                let mock = server
                    .mock("GET", "/user/repos")
                    .match_query(page_query(page as u32 + 1))
                    .with_status(200)
                    .with_body(body.to_string())
                    .expect(1)
                    .create_async()
                    .await;
                mocks.push(mock);
            }

            let client = client(&server, Some(&TEST_TOKEN));
            let repos = client.repos().fetch_all_repositories("octocat").await.unwrap();

            let urls: Vec<_> = repos.iter().map(|x| x.clone_url.as_str()).collect();
            assert_eq!(
                urls,
                ["https://github.com/octocat/tools.git", "https://github.com/OctoCat/dotfiles.git"]
            );
            for mock in &mocks {
                mock.assert_async().await;
            }
        }

        #[tokio::test]
        async fn test_list_repositories_is_lazy() {
            let mut server = Server::new_async().await;
            let page_1 = server
                .mock("GET", "/users/octocat/repos")
                .match_query(page_query(1))
                .with_status(200)
                .with_body(page_body(0, 100))
                .expect(1)
                .create_async()
                .await;
            let page_2 = server
                .mock("GET", "/users/octocat/repos")
                .match_query(page_query(2))
                .with_status(200)
                .with_body(page_body(100, 1))
                .expect(0)
                .create_async()
                .await;

            let client = client(&server, None);
            let repos = client.repos();
            let listing = repos.list_repositories("octocat").into_stream();
            let first: Vec<_> = listing.take(2).try_collect().await.unwrap();

            assert_eq!(first.len(), 2);
            page_1.assert_async().await;
            page_2.assert_async().await;
        }

        #[tokio::test]
        async fn test_create_repository() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/user/repos")
                .match_header("authorization", "Bearer t0k3n")
                .match_body(Matcher::Json(json!({ "name": "shiny", "private": true })))
                .with_status(201)
                .with_body(
                    json!({
                        "name": "shiny",
                        "full_name": "octocat/shiny",
                        "html_url": "https://github.com/octocat/shiny",
                        "private": true,
                    })
                    .to_string(),
                )
                .create_async()
                .await;

            let client = client(&server, Some(&TEST_TOKEN));
            let fields =
                CreateRepository { name: "shiny".into(), private: true, ..Default::default() };
            let created = client.repos().create_repository(&fields).await.unwrap();

            assert_eq!(created.full_name, "octocat/shiny");
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn test_delete_repository_reports_api_message() {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("DELETE", "/repos/octocat/shiny")
                .with_status(403)
                .with_body(r#"{"message":"Must have admin rights to Repository."}"#)
                .create_async()
                .await;

            let client = client(&server, Some(&TEST_TOKEN));
            let err = client.repos().delete_repository("octocat", "shiny").await.unwrap_err();

            assert_eq!(
                err.to_string(),
                "GitHub responded with 403 Forbidden: Must have admin rights to Repository."
            );
        }

        #[tokio::test]
        async fn test_mutations_require_token() {
            let server = Server::new_async().await;
            let client = client(&server, None);
            let err = client.repos().delete_repository("octocat", "shiny").await.unwrap_err();
            assert!(matches!(err, Error::Unauthenticated));
        }
    }
}

/// Turns a non-success response into [`Error::Api`], keeping the API message when there is one.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|x| x.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    debug!(%status, %message, "request failed");
    Err(Error::Api { status, message })
}
