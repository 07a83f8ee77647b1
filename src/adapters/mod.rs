// Adapters：對外部系統的具體實作（DeepWiki 後端、程式碼託管平台、本機檔案）

pub mod deepwiki;
pub mod http;
pub mod repo_host;
pub mod storage;
pub mod stream;

pub use deepwiki::DeepWikiClient;
pub use repo_host::HostedRepoLister;
pub use storage::LocalStorage;
