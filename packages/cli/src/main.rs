//! `sgraph` — socialgraph command-line client.
//!
//! - **`keygen`** — create an Ed25519 key file and print its public key.
//! - **`register`** — create a user bound to the key file's public key.
//! - **`show`** — print a user's profile.
//! - **`follow`** / **`unfollow`** — add or remove an edge from the acting user.
//! - **`following`** / **`followers`** / **`mutual`** — list neighbors.
//!
//! Requests that need a principal are signed with the key file and sent as
//! `--user-id`. Both can come from `SGRAPH_KEY_FILE` and `SGRAPH_USER_ID`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use reqwest::{blocking::Response, Method, Url};
use socialgraph::{encode_public_key, render, sign_request, Edge, Page, UserId, UserRef};
use socialgraph_api::{
    ErrorResponse, FollowRequest, RegisterRequest, UserProfile, UserRefList, UserRefPage,
};

/// sgraph — socialgraph client
///
/// Register users, manage follows, and query the follow graph.
#[derive(Parser)]
#[command(name = "sgraph", version, about, long_about = None)]
struct Cli {
    /// Base URL of the socialgraph server.
    #[arg(long, env = "SGRAPH_SERVER", default_value = "http://127.0.0.1:3000", global = true)]
    server: String,

    /// Acting user id; the key file must hold this user's key.
    #[arg(long, env = "SGRAPH_USER_ID", global = true)]
    user_id: Option<UserId>,

    /// Path to the hex-encoded Ed25519 seed.
    #[arg(long, env = "SGRAPH_KEY_FILE", default_value = "sgraph.key", global = true)]
    key_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new Ed25519 key and write its seed to the key file.
    Keygen {
        /// Overwrite an existing key file.
        #[arg(long)]
        force: bool,
    },

    /// Register a new user with the key file's public key.
    ///
    /// Prints the assigned id; pass it as --user-id (or SGRAPH_USER_ID) to
    /// act as that user.
    Register {
        #[arg(long, value_name = "TEXT")]
        name: String,
        #[arg(long)]
        handle: String,
        #[arg(long)]
        email: String,
    },

    /// Print a user's profile as JSON.
    Show { id: UserId },

    /// Follow a user.
    Follow { id: UserId },

    /// Stop following a user.
    Unfollow { id: UserId },

    /// List the users someone follows (default: the acting user).
    Following(ListArgs),

    /// List the users following someone (default: the acting user).
    Followers(ListArgs),

    /// List users who follow and are followed by someone (default: the acting user).
    Mutual {
        #[arg(long)]
        user: Option<UserId>,
    },
}

#[derive(clap::Args)]
struct ListArgs {
    #[arg(long)]
    user: Option<UserId>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Keygen { force } => {
            if cli.key_file.exists() && !force {
                fatal(&format!(
                    "{} already exists (use --force to overwrite)",
                    cli.key_file.display()
                ));
            }
            let key = SigningKey::generate(&mut OsRng);
            fs::write(&cli.key_file, hex::encode(key.to_bytes())).unwrap_or_else(|e| {
                fatal(&format!("failed to write {}: {e}", cli.key_file.display()))
            });
            println!("{}", encode_public_key(&key.verifying_key()));
        }

        Command::Register {
            name,
            handle,
            email,
        } => {
            let key = load_key(&cli.key_file);
            let api = Api::new(&cli.server);
            let req = RegisterRequest {
                display_name: name,
                handle,
                email,
                public_key: encode_public_key(&key.verifying_key()),
            };
            let profile: UserProfile = api.send(Method::POST, "/v1/users", None, Some(&req));
            println!("registered user {} (@{})", profile.id, profile.handle);
            println!("export SGRAPH_USER_ID={}", profile.id);
        }

        Command::Show { id } => {
            let api = Api::new(&cli.server);
            let profile: UserProfile = api.send(Method::GET, &format!("/v1/users/{id}"), None, None::<&()>);
            let json = serde_json::to_string_pretty(&profile)
                .unwrap_or_else(|e| fatal(&format!("failed to encode profile: {e}")));
            println!("{json}");
        }

        Command::Follow { id } => {
            let signer = Signer::load(&cli);
            let api = Api::new(&cli.server);
            let path = format!("/v1/users/{}/following", signer.user_id);
            let edge: Edge = api.send(
                Method::POST,
                &path,
                Some(&signer),
                Some(&FollowRequest { followee_id: id }),
            );
            print!("{}", render::render_edge(&edge));
        }

        Command::Unfollow { id } => {
            let signer = Signer::load(&cli);
            let api = Api::new(&cli.server);
            let path = format!("/v1/users/{}/following/{id}", signer.user_id);
            api.send_empty(Method::DELETE, &path, Some(&signer));
            println!("user {} no longer follows user {id}", signer.user_id);
        }

        Command::Following(ref args) => list(&cli, "following", "Following", args),
        Command::Followers(ref args) => list(&cli, "followers", "Followers", args),

        Command::Mutual { user } => {
            let signer = Signer::load(&cli);
            let api = Api::new(&cli.server);
            let target = user.unwrap_or(signer.user_id);
            let path = format!("/v1/users/{target}/mutual");
            let list: UserRefList = api.send(Method::GET, &path, Some(&signer), None::<&()>);
            print!("{}", render::render_user_refs(&format!("Mutual follows of {target}"), &list.items));
        }
    }
}

fn list(cli: &Cli, segment: &str, title: &str, args: &ListArgs) {
    let signer = Signer::load(cli);
    let api = Api::new(&cli.server);
    let target = args.user.unwrap_or(signer.user_id);
    let path = format!("/v1/users/{target}/{segment}{}", page_query(args.page, args.limit));
    let page: UserRefPage = api.send(Method::GET, &path, Some(&signer), None::<&()>);
    let page: Page<UserRef> = page.into();
    print!("{}", render::render_page(&format!("{title} of {target}"), &page));
}

/// `?page=&limit=` for whichever of the two are set.
fn page_query(page: Option<u32>, limit: Option<u32>) -> String {
    let params: Vec<String> = [("page", page), ("limit", limit)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| format!("{k}={v}")))
        .collect();
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

// ---------------------------------------------------------------------------
// Keys and signing
// ---------------------------------------------------------------------------

fn load_key(path: &Path) -> SigningKey {
    let raw = fs::read_to_string(path).unwrap_or_else(|e| {
        fatal(&format!(
            "failed to read key file {}: {e} (run `sgraph keygen` first)",
            path.display()
        ))
    });
    let bytes = hex::decode(raw.trim())
        .unwrap_or_else(|e| fatal(&format!("key file is not valid hex: {e}")));
    let seed: [u8; 32] = bytes
        .try_into()
        .unwrap_or_else(|_| fatal("key file must hold a 32-byte seed"));
    SigningKey::from_bytes(&seed)
}

struct Signer {
    user_id: UserId,
    key: SigningKey,
}

impl Signer {
    fn load(cli: &Cli) -> Self {
        let user_id = cli
            .user_id
            .unwrap_or_else(|| fatal("this command needs --user-id or SGRAPH_USER_ID"));
        Self {
            user_id,
            key: load_key(&cli.key_file),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

struct Api {
    http: reqwest::blocking::Client,
    base: Url,
    host: String,
}

impl Api {
    fn new(server: &str) -> Self {
        let base = Url::parse(server)
            .unwrap_or_else(|e| fatal(&format!("invalid --server {server:?}: {e}")));
        let host = host_header(&base)
            .unwrap_or_else(|| fatal(&format!("--server {server:?} has no host")));
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| fatal(&format!("failed to build HTTP client: {e}")));
        Self { http, base, host }
    }

    fn request<B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        signer: Option<&Signer>,
        body: Option<&B>,
    ) -> Response {
        let url = self
            .base
            .join(path)
            .unwrap_or_else(|e| fatal(&format!("invalid request path {path}: {e}")));
        let mut req = self.http.request(method.clone(), url).header("host", &self.host);
        if let Some(signer) = signer {
            let (date, signature) = sign_request(
                &signer.key,
                &signer.user_id.to_string(),
                method.as_str(),
                path,
                &self.host,
            );
            req = req.header("date", date).header("signature", signature);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .unwrap_or_else(|e| fatal(&format!("request to {} failed: {e}", self.base)));
        if !resp.status().is_success() {
            server_error(resp);
        }
        resp
    }

    fn send<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        signer: Option<&Signer>,
        body: Option<&B>,
    ) -> T {
        self.request(method, path, signer, body)
            .json()
            .unwrap_or_else(|e| fatal(&format!("unexpected response body: {e}")))
    }

    fn send_empty(&self, method: Method, path: &str, signer: Option<&Signer>) {
        self.request(method, path, signer, None::<&()>);
    }
}

/// The `Host` value a client sends for `url`: host, plus port when not the
/// scheme default.
fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Print the server's error body and exit with code 1.
fn server_error(resp: Response) -> ! {
    let status = resp.status();
    match resp.json::<ErrorResponse>() {
        Ok(err) => eprintln!("sgraph: {} ({}, {status})", err.error, err.code),
        Err(_) => eprintln!("sgraph: server returned {status}"),
    }
    process::exit(1);
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("sgraph: {msg}");
    process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_includes_non_default_port() {
        let url = Url::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(host_header(&url).as_deref(), Some("127.0.0.1:3000"));
        let url = Url::parse("https://graph.example.com").unwrap();
        assert_eq!(host_header(&url).as_deref(), Some("graph.example.com"));
    }

    #[test]
    fn page_query_only_carries_set_values() {
        assert_eq!(page_query(None, None), "");
        assert_eq!(page_query(Some(2), None), "?page=2");
        assert_eq!(page_query(Some(2), Some(5)), "?page=2&limit=5");
    }

    #[test]
    fn cli_reads_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sgraph", "following", "--user", "4", "--limit", "5", "--user-id", "1",
        ])
        .unwrap();
        assert_eq!(cli.user_id, Some(UserId(1)));
        match cli.command {
            Command::Following(args) => {
                assert_eq!(args.user, Some(UserId(4)));
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("expected following"),
        }
    }
}
