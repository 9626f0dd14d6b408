use ahash::AHashMap;
use anyhow::{anyhow, bail};
use std::path::{Component, Path, PathBuf};
use url::Url;
use vista_utils::{AnyResult, AnyhowResultExt};

/// A single asset fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// URI of the asset, as written in the `load` node.
    pub uri: String,
    /// Where the request should actually go, with the proxy applied.
    pub url: String,
}

impl FetchRequest {
    pub fn new(uri: &str, proxy: Option<&Url>) -> Self {
        Self {
            uri: uri.to_string(),
            url: match proxy {
                Some(proxy) => proxy_url(proxy, uri).into(),
                None => uri.to_string(),
            },
        }
    }
}

/// Source of asset payloads. Implementations are called from the fetch worker threads, and may
/// block for as long as they need.
///
/// Closures with a matching signature implement this trait too.
pub trait AssetFetcher: Send + Sync {
    /// Returns the raw payload, either plain JSON or JSONP.
    fn fetch(&self, request: &FetchRequest) -> AnyResult<String>;
}

impl<F> AssetFetcher for F
where
    F: Fn(&FetchRequest) -> AnyResult<String> + Send + Sync,
{
    fn fetch(&self, request: &FetchRequest) -> AnyResult<String> {
        self(request)
    }
}

/// Routes a cross-domain URI through a proxy, passing the target as the form encoded `uri`
/// query parameter. Existing query parameters of the proxy are kept.
///
/// ```
/// use vista::assets::{proxy_url, Url};
///
/// let proxy = Url::parse("http://localhost/proxy").unwrap();
/// assert_eq!(
///     proxy_url(&proxy, "http://a.com/b c.js").as_str(),
///     "http://localhost/proxy?uri=http%3A%2F%2Fa.com%2Fb+c.js",
/// );
/// ```
pub fn proxy_url(proxy: &Url, uri: &str) -> Url {
    let mut url = proxy.clone();
    url.query_pairs_mut().append_pair("uri", uri);
    url
}

/// Serves assets from a local directory tree.
///
/// `http://host/path` and `https://host/path` URIs map to `root/host/path`, `file://` URIs are
/// used as absolute paths, and anything else is relative to the root.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the local path of an asset URI.
    pub fn resolve(&self, uri: &str) -> AnyResult<PathBuf> {
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }

        let relative = uri
            .strip_prefix("http://")
            .or_else(|| uri.strip_prefix("https://"))
            .unwrap_or(uri);
        // Query strings and fragments don't name files
        let relative = relative
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or(relative);

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("asset URI `{uri}` escapes the asset directory");
        }

        Ok(self.root.join(relative))
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(&self, request: &FetchRequest) -> AnyResult<String> {
        let path = self.resolve(&request.uri)?;
        std::fs::read_to_string(&path).otherwise(format!("couldn't read `{}`", path.display()))
    }
}

/// Serves assets from memory, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    assets: AHashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: impl Into<String>, payload: impl Into<String>) -> Self {
        self.insert(uri, payload);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, payload: impl Into<String>) {
        self.assets.insert(uri.into(), payload.into());
    }
}

impl AssetFetcher for StaticFetcher {
    fn fetch(&self, request: &FetchRequest) -> AnyResult<String> {
        self.assets
            .get(&request.uri)
            .cloned()
            .ok_or_else(|| anyhow!("no asset registered for `{}`", request.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_composition() {
        let proxy = Url::parse("http://scenejs.org/cgi-bin/jsonp_wrapper.pl").unwrap();
        let request = FetchRequest::new(
            "http://scenejs.org/library/v0.7/assets/teapot/teapot.js",
            Some(&proxy),
        );
        assert_eq!(
            request.url,
            "http://scenejs.org/cgi-bin/jsonp_wrapper.pl?uri=\
             http%3A%2F%2Fscenejs.org%2Flibrary%2Fv0.7%2Fassets%2Fteapot%2Fteapot.js"
        );

        let keyed = Url::parse("http://p/?key=1").unwrap();
        assert_eq!(proxy_url(&keyed, "a&b").as_str(), "http://p/?key=1&uri=a%26b");
        assert_eq!(
            proxy_url(&keyed, "ünï").query(),
            Some("key=1&uri=%C3%BCn%C3%AF")
        );
        assert_eq!(FetchRequest::new("a.js", None).url, "a.js");
    }

    #[test]
    fn proxied_uris_survive_a_round_trip() {
        let proxy = Url::parse("http://localhost/proxy#top").unwrap();
        let uri = "http://a.com/b.js?x=1&y=2#frag";
        let proxied = proxy_url(&proxy, uri);

        let (key, value) = proxied.query_pairs().next().unwrap();
        assert_eq!(key, "uri");
        assert_eq!(value, uri);
        assert_eq!(proxied.fragment(), Some("top"));
    }

    #[test]
    fn file_paths() {
        let fetcher = FileFetcher::new("/assets");
        assert_eq!(
            fetcher.resolve("http://example.com/teapot/teapot.js?v=2").unwrap(),
            PathBuf::from("/assets/example.com/teapot/teapot.js")
        );
        assert_eq!(
            fetcher.resolve("models/box.json").unwrap(),
            PathBuf::from("/assets/models/box.json")
        );
        assert_eq!(
            fetcher.resolve("file:///tmp/x.json").unwrap(),
            PathBuf::from("/tmp/x.json")
        );
        assert!(fetcher.resolve("http://example.com/../../etc/passwd").is_err());
        assert!(fetcher.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn static_assets() {
        let fetcher = StaticFetcher::new().with("a", "[]");
        assert_eq!(fetcher.fetch(&FetchRequest::new("a", None)).unwrap(), "[]");
        assert!(fetcher.fetch(&FetchRequest::new("b", None)).is_err());
    }

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |request: &FetchRequest| -> AnyResult<String> { Ok(request.url.clone()) };
        let proxy = Url::parse("http://proxy").unwrap();
        let request = FetchRequest::new("x y", Some(&proxy));
        assert_eq!(fetcher.fetch(&request).unwrap(), "http://proxy/?uri=x+y");
    }
}
