use crate::adapters::http::{build_client, classify_send_error, ensure_ok};
use crate::config::settings::HostsConfig;
use crate::domain::model::{RepoHost, RepoInfo};
use crate::domain::ports::RepoFileLister;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

const GITLAB_PAGE_SIZE: &str = "100";
const BITBUCKET_MAX_DEPTH: &str = "50";

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GithubBranch {
    commit: GithubBranchCommit,
}

#[derive(Debug, Deserialize)]
struct GithubBranchCommit {
    commit: GithubCommit,
}

#[derive(Debug, Deserialize)]
struct GithubCommit {
    tree: GithubTreeRef,
}

#[derive(Debug, Deserialize)]
struct GithubTreeRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GithubTree {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    mainbranch: Option<BitbucketBranch>,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPage {
    values: Vec<TreeItem>,
    next: Option<String>,
}

/// 透過 GitHub / GitLab / Bitbucket 公開 API 列出儲存庫檔案
#[derive(Debug, Clone)]
pub struct HostedRepoLister {
    client: Client,
    hosts: HostsConfig,
    timeout: Duration,
}

impl HostedRepoLister {
    pub fn new(hosts: &HostsConfig, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(connect_timeout)?,
            hosts: hosts.clone(),
            timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
        step: &str,
    ) -> Result<(T, HeaderMap)> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(url, self.timeout, e))?;
        let response = ensure_ok(response, step).await?;
        let headers = response.headers().clone();
        let body = response.json::<T>().await?;
        Ok((body, headers))
    }

    async fn list_github(&self, repo: &RepoInfo, token: Option<&str>) -> Result<Vec<String>> {
        let base = format!(
            "{}/repos/{}/{}",
            self.hosts.github_api.trim_end_matches('/'),
            repo.owner,
            repo.repo
        );
        let github = |url: &str| {
            let request = self
                .client
                .get(url)
                .header("Accept", "application/vnd.github.v3+json");
            match token {
                Some(token) => request.header("Authorization", format!("token {}", token)),
                None => request,
            }
        };

        let (info, _) = self
            .get_json::<GithubRepo>(github(&base), &base, "get repo info")
            .await?;

        let branch_url = format!("{}/branches/{}", base, info.default_branch);
        let (branch, _) = self
            .get_json::<GithubBranch>(github(&branch_url), &branch_url, "get branch info")
            .await?;

        let tree_url = format!(
            "{}/git/trees/{}?recursive=1",
            base, branch.commit.commit.tree.sha
        );
        let (tree, _) = self
            .get_json::<GithubTree>(github(&tree_url), &tree_url, "get git tree")
            .await?;

        if tree.truncated {
            tracing::warn!("GitHub truncated the file tree of {}/{}", repo.owner, repo.repo);
        }

        Ok(blob_paths(tree.tree, "blob"))
    }

    async fn list_gitlab(&self, repo: &RepoInfo, token: Option<&str>) -> Result<Vec<String>> {
        let project: String =
            url::form_urlencoded::byte_serialize(format!("{}/{}", repo.owner, repo.repo).as_bytes())
                .collect();
        let url = format!(
            "{}/projects/{}/repository/tree",
            self.hosts.gitlab_api.trim_end_matches('/'),
            project
        );

        let mut files = Vec::new();
        let mut seen_pages = HashSet::new();
        let mut page = "1".to_string();
        loop {
            seen_pages.insert(page.clone());
            let mut request = self.client.get(&url).query(&[
                ("recursive", "true"),
                ("per_page", GITLAB_PAGE_SIZE),
                ("page", page.as_str()),
            ]);
            if let Some(token) = token {
                request = request.header("PRIVATE-TOKEN", token);
            }

            let (items, headers) = self
                .get_json::<Vec<TreeItem>>(request, &url, "get repository tree")
                .await?;
            files.extend(blob_paths(items, "blob"));

            // 最後一頁的 x-next-page 為空字串
            match headers
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                Some(next) if seen_pages.contains(next) => {
                    tracing::warn!("GitLab repeated tree page {}; stopping pagination", next);
                    break;
                }
                Some(next) => page = next.to_string(),
                None => break,
            }
        }

        Ok(files)
    }

    async fn list_bitbucket(&self, repo: &RepoInfo, token: Option<&str>) -> Result<Vec<String>> {
        let base = format!(
            "{}/repositories/{}/{}",
            self.hosts.bitbucket_api.trim_end_matches('/'),
            repo.owner,
            repo.repo
        );
        let bitbucket = |url: &str| {
            let request = self.client.get(url);
            match token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        };

        let (info, _) = self
            .get_json::<BitbucketRepo>(bitbucket(&base), &base, "get repo info")
            .await?;
        let branch = info
            .mainbranch
            .map(|b| b.name)
            .unwrap_or_else(|| "HEAD".to_string());

        let mut files = Vec::new();
        let mut next = Some(format!(
            "{}/src/{}/?max_depth={}&pagelen=100",
            base, branch, BITBUCKET_MAX_DEPTH
        ));
        let mut seen_urls = HashSet::new();
        while let Some(url) = next {
            let (page, _) = self
                .get_json::<BitbucketPage>(bitbucket(&url), &url, "get source listing")
                .await?;
            files.extend(blob_paths(page.values, "commit_file"));
            seen_urls.insert(url);

            next = match page.next {
                Some(link) if seen_urls.contains(&link) => {
                    tracing::warn!("Bitbucket repeated page {}; stopping pagination", link);
                    None
                }
                link => link,
            };
        }

        Ok(files)
    }
}

fn blob_paths(items: Vec<TreeItem>, file_kind: &str) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| item.kind == file_kind)
        .map(|item| item.path)
        .collect()
}

#[async_trait]
impl RepoFileLister for HostedRepoLister {
    async fn list_files(&self, repo: &RepoInfo, token: Option<&str>) -> Result<Vec<String>> {
        tracing::info!(
            "Listing files of {}/{} on {}...",
            repo.owner,
            repo.repo,
            repo.repo_type.as_str()
        );

        let files = match repo.repo_type {
            RepoHost::Github => self.list_github(repo, token).await?,
            RepoHost::Gitlab => self.list_gitlab(repo, token).await?,
            RepoHost::Bitbucket => self.list_bitbucket(repo, token).await?,
        };

        tracing::info!("Found {} files", files.len());
        Ok(files)
    }
}
