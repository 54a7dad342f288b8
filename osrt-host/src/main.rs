//! osaurus-host — runtime host process for the osaurus plugin runtime.
//!
//! Bootstraps the master identity and its derived agent key, loads every
//! plugin already installed under `tools_root`, and exercises the dispatch
//! path end-to-end once at startup. This binary does not bind a network
//! listener itself — `osrt-gateway::route_matcher` and `Dispatcher` are the
//! pieces a real front door would sit in front of.

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use osrt_core::config::RuntimeConfig;
use osrt_core::model::RouteAuth;
use osrt_crypto::derive::derive_address;
use osrt_crypto::master_key::MasterKeyGuard;
use osrt_crypto::signing::address_from_private_key;
use osrt_gateway::http_translate::{build_request, BuildRequestArgs, OsaurusUrls};
use osrt_gateway::{Dispatcher, RateLimiter};
use osrt_identity::{
    AccessKeyValidator, CounterStore, FileSecretStore, RevocationStore, SecretStore, WhitelistStore,
};
use osrt_plugin::PluginRegistry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Global shutdown flag, checked by the main loop and flipped by the signal
/// handler.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const MASTER_KEY_SERVICE: &str = "com.osaurus.identity";
const MASTER_KEY_ACCOUNT: &str = "master-key";

/// Index of the agent key every route/tool demonstration call signs with.
/// Real deployments derive one agent key per connected client; the host
/// itself only ever needs the primary one to stand up its own identity.
const PRIMARY_AGENT_INDEX: u32 = 0;

#[derive(Parser, Debug)]
#[command(name = "osaurus-host", version, about = "osaurus plugin runtime host")]
struct Cli {
    /// Path to the runtime's YAML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `logging.level` from the config file.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(cli.config.as_ref().and_then(|p| p.to_str()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    osrt_observability::init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "osaurus host starting");

    std::fs::create_dir_all(&config.tools_root)?;
    std::fs::create_dir_all(&config.data_root)?;

    let secrets: Arc<dyn SecretStore> =
        Arc::new(FileSecretStore::new(config.data_root.join("secrets")));

    let master_key = load_or_generate_master_key(secrets.as_ref())?;
    let master_address = address_from_private_key(master_key.as_bytes())?;
    let agent_address = derive_address(master_key.as_ref(), PRIMARY_AGENT_INDEX)?;
    info!(
        master = %master_address.to_checksum_string(),
        agent = %agent_address.to_checksum_string(),
        "identity ready"
    );

    let whitelist = WhitelistStore::load(Arc::clone(&secrets))?;
    let revocation = RevocationStore::load(Arc::clone(&secrets))?;
    let counters = Arc::new(CounterStore::new());

    let master_checksum = master_address.to_checksum_string();
    let agent_checksum = agent_address.to_checksum_string();
    let effective_whitelist = whitelist.effective_whitelist(&agent_checksum, &master_checksum);
    let _validator = AccessKeyValidator::new(
        agent_checksum.clone(),
        master_checksum.clone(),
        effective_whitelist,
        revocation.snapshot(),
        Arc::clone(&counters),
        true,
    );
    info!("access-key validator bootstrapped from whitelist and revocation stores");

    let registry = Arc::new(PluginRegistry::new(
        config.tools_root.clone(),
        config.data_root.clone(),
        Arc::clone(&secrets),
    ));
    let loaded = scan_and_load_plugins(&registry, &config.tools_root);
    info!(plugins = loaded, tools_root = %config.tools_root.display(), "startup plugin scan complete");

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limiter.max_tokens,
        config.rate_limiter.refill_per_second,
    ));
    let dispatcher = Arc::new(Dispatcher::new());
    let dispatch_timeout = Duration::from_millis(config.dispatch.timeout_ms);

    {
        let registry = Arc::clone(&registry);
        let dispatcher = Arc::clone(&dispatcher);
        let rate_limiter = Arc::clone(&rate_limiter);
        std::thread::Builder::new()
            .name("osrt-demo".to_string())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .expect("failed to build tokio runtime for demonstration dispatch");
                rt.block_on(demonstrate_dispatch(registry, dispatcher, rate_limiter, dispatch_timeout));
            })
            .expect("failed to spawn demonstration dispatch thread");
    }

    setup_signal_handler();
    info!("osaurus host ready, waiting for shutdown signal");

    while !SHUTDOWN.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutdown signal received, stopping");
    Ok(())
}

/// Loads the master key from the secret store, generating and persisting a
/// fresh one on first run. The returned guard zeroizes its bytes on drop;
/// callers must never clone the key material out of it.
fn load_or_generate_master_key(secrets: &dyn SecretStore) -> anyhow::Result<MasterKeyGuard> {
    if let Some(bytes) = secrets.read(MASTER_KEY_SERVICE, MASTER_KEY_ACCOUNT)? {
        if bytes.len() == 32 {
            let mut key = [0u8; 32];
            key.copy_from_slice(&bytes);
            return Ok(MasterKeyGuard::from_bytes(key));
        }
        warn!("stored master key slot has the wrong length, regenerating");
    }

    let key = MasterKeyGuard::generate()?;
    secrets.write(MASTER_KEY_SERVICE, MASTER_KEY_ACCOUNT, key.as_bytes())?;
    info!("generated new master key");
    Ok(key)
}

/// Scans `tools_root` for `<plugin_id>/current` install directories and
/// loads each one found. A plugin that fails to load is logged and skipped
/// rather than aborting the scan.
fn scan_and_load_plugins(registry: &PluginRegistry, tools_root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(tools_root) else {
        return 0;
    };

    let mut count = 0;
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let plugin_id = entry.file_name().to_string_lossy().into_owned();
        let current = entry.path().join("current");
        if !current.exists() {
            continue;
        }
        match registry.load_from_dir(&plugin_id, &current) {
            Ok(record) => {
                info!(plugin = %record.plugin_id, version = ?record.version, "plugin loaded at startup");
                count += 1;
            }
            Err(error) => {
                warn!(plugin = %plugin_id, %error, "failed to load plugin at startup");
            }
        }
    }
    count
}

/// Exercises every loaded plugin's declared routes through the dispatcher
/// once, the same way a real request would travel: rate-limited for
/// non-owner routes, translated to the plugin's JSON wire format, and run
/// on the shared dispatch work queue.
async fn demonstrate_dispatch(
    registry: Arc<PluginRegistry>,
    dispatcher: Arc<Dispatcher>,
    rate_limiter: Arc<RateLimiter>,
    timeout: Duration,
) {
    for record in registry.list() {
        for route in &record.manifest.capabilities.routes {
            if route.auth != RouteAuth::Owner && !rate_limiter.allow(&record.plugin_id) {
                warn!(plugin = %record.plugin_id, route = %route.id, "demonstration request rate limited");
                continue;
            }

            let request = build_request(BuildRequestArgs {
                route_id: &route.id,
                method: route.methods.first().map(String::as_str).unwrap_or("GET"),
                path: &route.path,
                query: Default::default(),
                headers: Default::default(),
                body: b"",
                remote_addr: "127.0.0.1",
                plugin_id: &record.plugin_id,
                osaurus: OsaurusUrls {
                    base_url: "http://127.0.0.1".to_string(),
                    plugin_url: format!("http://127.0.0.1/plugins/{}", record.plugin_id),
                },
            });
            let request_json =
                serde_json::to_string(&request).expect("PluginHttpRequest always serializes");

            let started = std::time::Instant::now();
            let outcome = dispatcher
                .handle_route(&registry, &record.plugin_id, &request_json, timeout)
                .await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

            let status = match &outcome {
                Ok(_) => 200,
                Err(error) => error.status_code(),
            };
            osrt_observability::access_log::AccessLogEntry::now(
                route.id.clone(),
                "127.0.0.1",
                request.method.clone(),
                route.path.clone(),
                status,
                latency_ms,
                None,
            )
            .emit();

            match outcome {
                Ok(response) => {
                    info!(plugin = %record.plugin_id, route = %route.id, %response, "demonstration route dispatched")
                }
                Err(error) => {
                    warn!(plugin = %record.plugin_id, route = %route.id, %error, "demonstration route dispatch failed")
                }
            }
        }
    }
}

fn setup_signal_handler() {
    for sig in [libc::SIGTERM, libc::SIGINT] {
        unsafe {
            libc::signal(sig, signal_handler as libc::sighandler_t);
        }
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}
