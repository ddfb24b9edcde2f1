/*
 * main.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Sonda, a hand-written HTTP/1.0 client.
 *
 * Sonda is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sonda is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sonda.  If not, see <http://www.gnu.org/licenses/>.
 */

//! The `sonda` command: issue one GET, POST, HEAD or PUT request through sonda_core.
//!
//! Flags are accepted in the single-dash long form (`-url`, `-useProxyServer host port`) as well
//! as the usual `--url`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use sonda_core::uri::{append_query, encode_form, split_params};
use sonda_core::{ClientConfig, HttpClient, LineEnding};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sonda", version, about = "Hand-written HTTP/1.0 client")]
struct Cli {
    /// GET, POST, HEAD or PUT (any case)
    verb: Option<String>,

    /// Target URL
    #[arg(long)]
    url: Option<String>,

    /// Write the response body to this file instead of stdout
    #[arg(long)]
    outfile: Option<PathBuf>,

    /// Request body file for POST and PUT
    #[arg(long)]
    file: Option<PathBuf>,

    /// Form parameters, `a=1&b=2`
    #[arg(long)]
    parameters: Option<String>,

    /// Content-type of the request body
    #[arg(long)]
    contenttypestring: Option<String>,

    /// Accept header value
    #[arg(long)]
    acceptstring: Option<String>,

    /// User-Agent header value
    #[arg(long)]
    useragent: Option<String>,

    /// Proxy host and port
    #[arg(long, num_args = 2, value_names = ["HOST", "PORT"])]
    useproxyserver: Option<Vec<String>>,

    /// Basic authentication user and password
    #[arg(long, num_args = 2, value_names = ["USER", "PASSWORD"])]
    useauthentication: Option<Vec<String>>,

    /// Maximum requests per call, redirects and frames included
    #[arg(long)]
    recursionlimit: Option<u32>,

    /// Connect and read timeout in milliseconds, 0 for none
    #[arg(long)]
    requesttimeout: Option<u64>,

    #[arg(long, overrides_with = "nodebug")]
    debug: bool,
    #[arg(long, overrides_with = "debug")]
    nodebug: bool,

    #[arg(long, overrides_with = "noverbose")]
    verbose: bool,
    #[arg(long, overrides_with = "verbose")]
    noverbose: bool,

    #[arg(long, overrides_with = "noautoredirect")]
    autoredirect: bool,
    #[arg(long, overrides_with = "autoredirect")]
    noautoredirect: bool,

    #[arg(long, overrides_with = "noallowcookies")]
    allowcookies: bool,
    #[arg(long, overrides_with = "allowcookies")]
    noallowcookies: bool,

    /// Do not send Referer
    #[arg(long)]
    noreferer: bool,

    /// Do not send User-Agent
    #[arg(long)]
    nouseragent: bool,

    /// Do not send Host
    #[arg(long)]
    nohost: bool,

    /// Do not send Accept
    #[arg(long)]
    noaccept: bool,

    /// Do not send Content-type
    #[arg(long)]
    nocontenttype: bool,

    /// Terminate request lines with LF instead of CRLF
    #[arg(long)]
    nolf: bool,
}

/// Rewrite single-dash long flags (`-useProxyServer`) as `--useproxyserver`.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let single_dash_long = arg.len() > 2
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
            if i > 0 && single_dash_long {
                format!("-{}", arg.to_ascii_lowercase())
            } else if i > 0 && arg.starts_with("--") {
                arg.to_ascii_lowercase()
            } else {
                arg
            }
        })
        .collect()
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    fn config(&self) -> Result<ClientConfig, String> {
        let mut config = ClientConfig::default();
        if let Some(ms) = self.requesttimeout {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(n) = self.recursionlimit {
            config = config.with_recursion_limit(n);
        }
        if let Some(proxy) = &self.useproxyserver {
            let port = proxy[1]
                .parse::<u16>()
                .map_err(|_| format!("invalid proxy port: {}", proxy[1]))?;
            config = config.with_proxy(proxy[0].clone(), port);
        }
        if let Some(auth) = &self.useauthentication {
            config = config.with_basic_auth(auth[0].clone(), auth[1].clone());
        }
        if let Some(ct) = &self.contenttypestring {
            config.content_type = ct.clone();
        }
        if let Some(accept) = &self.acceptstring {
            config.accept = accept.clone();
        }
        if let Some(ua) = &self.useragent {
            config.user_agent = ua.clone();
        }
        if self.noautoredirect {
            config.auto_redirect = false;
        }
        if self.noallowcookies {
            config.allow_cookies = false;
        }
        config.send_referer = !self.noreferer;
        config.send_user_agent = !self.nouseragent;
        config.send_host = !self.nohost;
        config.send_accept = !self.noaccept;
        config.send_content_type = !self.nocontenttype;
        if self.nolf {
            config = config.with_line_ending(LineEnding::Lf);
        }
        Ok(config)
    }
}

async fn emit(text: &str, outfile: Option<&PathBuf>) -> Result<(), String> {
    match outfile {
        Some(path) => tokio::fs::write(path, text.as_bytes())
            .await
            .map_err(|e| format!("cannot write {}: {}", path.display(), e)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

async fn run(cli: Cli, verb: &str, url: &str) -> Result<ExitCode, String> {
    let config = cli.config()?;
    let content_type = config.content_type.clone();
    let params = cli.parameters.as_deref().map(split_params).unwrap_or_default();
    let mut client = HttpClient::new(config);
    match verb {
        "get" => match &cli.outfile {
            Some(path) => {
                let mut file = tokio::fs::File::create(path)
                    .await
                    .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
                let url = append_query(url, &encode_form(&params));
                let n = client.get_to_sink(&url, &mut file).await;
                tracing::info!("wrote {} bytes to {}", n, path.display());
            }
            None => {
                let text = client.get_with_params(url, &params).await;
                emit(&text, None).await?;
            }
        },
        "post" => {
            let text = match &cli.file {
                Some(path) => client.post_file(url, path, &content_type).await,
                None => client.post(url, &params).await,
            };
            emit(&text, cli.outfile.as_ref()).await?;
        }
        "head" => {
            let headers = client.head(url).await;
            let mut out = String::new();
            for header in headers.iter() {
                for value in &header.values {
                    out.push_str(&format!("{}: {}\n", header.name, value));
                }
            }
            emit(out.trim_end(), cli.outfile.as_ref()).await?;
        }
        "put" => {
            let created = match &cli.file {
                Some(path) => client.put_file(url, path, &content_type).await,
                None => {
                    let body = cli.parameters.clone().unwrap_or_default();
                    client.put(url, body, &content_type).await
                }
            };
            println!("{}", if created { "created" } else { "failed" });
            if !created {
                return Ok(ExitCode::FAILURE);
            }
        }
        other => return Err(format!("unknown verb {:?}: expected GET, POST, HEAD or PUT", other)),
    }
    if let Some(e) = client.last_error() {
        tracing::debug!("last error: {}", e);
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args()));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with_writer(std::io::stderr)
        .init();

    let Some(verb) = cli.verb.as_deref().map(str::to_ascii_lowercase) else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };
    let Some(url) = cli.url.clone() else {
        eprintln!("error: -url is required");
        return ExitCode::FAILURE;
    };
    match run(cli, &verb, &url).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
