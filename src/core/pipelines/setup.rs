//! Housekeeping pipelines: settings dump, clean, lockfile gate, JVM SDK fetch.

use crate::error::{Error, Result};
use crate::fetch::{self, FetchRequest, ProxyStrategy};
use crate::manifest;
use crate::node::{scoped, series, Node};
use crate::settings::ProxySettings;
use crate::transfer;

pub fn troubleshoot() -> Node {
    Node::from_fn("troubleshoot", |ctx| {
        let settings = ctx.settings();
        crate::log_status!("troubleshoot", "Use shelm: {}", settings.use_shelm);
        crate::log_status!("troubleshoot", "Project root: {}", settings.root.display());
        crate::log_status!("troubleshoot", "Node: {}", settings.node);
        crate::log_status!(
            "troubleshoot",
            "JVM SDK: {} {} via {:?}",
            settings.jvm_sdk.repository,
            settings.jvm_sdk.reference(),
            settings.jvm_sdk.transport
        );

        let rendered = serde_json::to_string_pretty(settings)
            .map_err(|e| Error::internal_json(e.to_string(), Some("render settings".to_string())))?;
        tracing::debug!("Resolved settings:\n{}", rendered);
        Ok(())
    })
}

pub fn clean() -> Node {
    Node::from_fn("clean", |ctx| {
        let removed = transfer::remove(&[
            ctx.path("tests-integration/reference-model/Dockerfile"),
            ctx.path("dist"),
        ])?;
        crate::log_status!("clean", "Removed {} path(s)", removed);
        Ok(())
    })
}

pub fn check_package_lock() -> Node {
    Node::from_fn("check-package-lock", |ctx| {
        let settings = ctx.settings();
        manifest::check_lockfile(&settings.lockfile_path(), &settings.disallowed_runtime_packages)
    })
}

/// Clone the JVM SDK into a scratch directory and copy its Scala sources
/// into `redistributable/Scala/sdk`. The clone is removed afterwards.
pub fn jvm_sdk() -> Node {
    scoped("morphir-jvm", jvm_sdk_steps()).named("jvm-sdk")
}

/// Clone and copy steps; both expect a scratch directory.
fn jvm_sdk_steps() -> Node {
    series(vec![
        Node::from_fn("clone-morphir-jvm", |ctx| {
            let sdk = &ctx.settings().jvm_sdk;
            let proxy = proxy_for(&sdk.repository, &ctx.settings().proxy)?;
            let request = FetchRequest::new(&sdk.repository, sdk.reference(), ctx.scratch_dir()?)
                .attempts(sdk.attempts);
            fetch::fetch(&request, sdk.transport, &proxy)
        }),
        Node::from_fn("copy-morphir-jvm-assets", |ctx| {
            let pattern = ctx.scratch_dir()?.join("morphir/sdk/**");
            let copied =
                transfer::copy_glob(&pattern.to_string_lossy(), &ctx.path("redistributable/Scala/sdk"))?;
            if copied == 0 {
                return Err(Error::validation_invalid_argument(
                    "jvmSdk",
                    format!(
                        "No Scala sources under morphir/sdk in {} at {}",
                        ctx.settings().jvm_sdk.repository,
                        ctx.settings().jvm_sdk.reference()
                    ),
                    None,
                    None,
                )
                .with_hint("Check jvmSdk.repository and jvmSdk.version in morphir-build.json"));
            }
            Ok(())
        }),
    ])
}

/// Proxy for requests to `url`: the HTTPS proxy for `https` URLs, the HTTP
/// proxy otherwise, direct when the matching proxy is unset.
pub fn proxy_for(url: &str, proxy: &ProxySettings) -> Result<ProxyStrategy> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        Error::validation_invalid_argument(
            "url",
            format!("Invalid repository URL '{}': {}", url, e),
            Some(url.to_string()),
            None,
        )
    })?;

    let configured = match parsed.scheme() {
        "https" => proxy.https.as_ref(),
        _ => proxy.http.as_ref(),
    };

    Ok(match configured {
        Some(proxy_url) => ProxyStrategy::Via(proxy_url.clone()),
        None => ProxyStrategy::Direct,
    })
}
