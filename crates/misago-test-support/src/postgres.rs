//! Disposable Postgres databases for integration tests.
//!
//! An external server is used when `MISAGO_TEST_DATABASE_URL` is set; otherwise a
//! throwaway cluster is spawned from local `initdb`/`postgres` binaries. Either way
//! every [`TestDatabase`] owns a freshly created database that is dropped with it.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use postgres::NoTls;
use url::Url;

/// Environment variable pointing at an existing Postgres server.
pub const DATABASE_URL_ENV: &str = "MISAGO_TEST_DATABASE_URL";

/// Freshly created database, dropped (with its server, if spawned) on drop.
pub struct TestDatabase {
    url: String,
    admin_url: String,
    name: String,
    // dropped after the database
    #[allow(dead_code)]
    server: Option<LocalServer>,
}

impl TestDatabase {
    /// Connection string for `sqlx` or any other Postgres client.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.url
    }

    /// Name of the created database.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let _ = run_admin(
            &self.admin_url,
            format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name),
        );
    }
}

struct LocalServer {
    process: Child,
    data_dir: PathBuf,
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
        let _ = fs::remove_dir_all(&self.data_dir);
    }
}

/// Create a disposable database.
///
/// # Errors
///
/// Returns an error when neither `MISAGO_TEST_DATABASE_URL` nor local Postgres
/// binaries are usable, or when the database cannot be created.
pub fn start_postgres() -> Result<TestDatabase> {
    match std::env::var(DATABASE_URL_ENV) {
        Ok(url) => create_database(&url, None),
        Err(_) => {
            let server = spawn_local_server()?;
            let base = format!("postgres://postgres@127.0.0.1:{}/postgres", server.port);
            create_database(&base, Some(server.server))
        }
    }
}

/// Create a disposable database, or log why `suite` is skipped and return `None`.
#[must_use]
pub fn postgres_or_skip(suite: &str) -> Option<TestDatabase> {
    match start_postgres() {
        Ok(database) => Some(database),
        Err(err) => {
            eprintln!("skipping {suite}: postgres unavailable ({err:#})");
            None
        }
    }
}

fn create_database(base_url: &str, server: Option<LocalServer>) -> Result<TestDatabase> {
    let base = Url::parse(base_url).context("invalid postgres connection url")?;
    let name = unique_database_name();

    let mut last_error = None;
    for admin_url in admin_urls(&base) {
        match run_admin(&admin_url, format!("CREATE DATABASE \"{name}\"")) {
            Ok(()) => {
                let mut url = base.clone();
                url.set_path(&format!("/{name}"));
                return Ok(TestDatabase {
                    url: url.to_string(),
                    admin_url,
                    name,
                    server,
                });
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("no admin database to connect to")))
}

/// Maintenance database first, then the database named in the url.
fn admin_urls(base: &Url) -> Vec<String> {
    let mut admin = base.clone();
    admin.set_path("/postgres");
    let mut urls = vec![admin.to_string()];
    if admin.path() != base.path() {
        urls.push(base.to_string());
    }
    urls
}

fn run_admin(admin_url: &str, statement: String) -> Result<()> {
    let admin_url = admin_url.to_string();
    // the blocking client must not run on a tokio worker
    thread::spawn(move || -> Result<()> {
        let mut client = postgres::Config::from_str(&admin_url)?.connect(NoTls)?;
        client
            .simple_query(&statement)
            .with_context(|| format!("failed to execute `{statement}`"))?;
        Ok(())
    })
    .join()
    .unwrap_or_else(|_| Err(anyhow!("admin connection thread panicked")))
}

fn unique_database_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("misago_test_{}_{nanos}", std::process::id())
}

struct SpawnedServer {
    server: LocalServer,
    port: u16,
}

fn spawn_local_server() -> Result<SpawnedServer> {
    let initdb = find_binary("initdb")?;
    let postgres = find_binary("postgres")?;
    let pg_isready = find_binary("pg_isready")?;

    let data_dir = std::env::temp_dir().join(unique_database_name());
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let data = data_dir
        .to_str()
        .context("data dir contains non-utf8 characters")?
        .to_string();

    let status = Command::new(initdb)
        .args(["-D", &data, "--username=postgres", "--auth=trust"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run initdb")?;
    if !status.success() {
        let _ = fs::remove_dir_all(&data_dir);
        bail!("initdb exited with {status}");
    }

    let port = free_port()?;
    let process = Command::new(postgres)
        .args(["-D", &data, "-p", &port.to_string(), "-h", "127.0.0.1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start postgres")?;
    let server = LocalServer { process, data_dir };

    wait_until_ready(&pg_isready, port)?;
    Ok(SpawnedServer { server, port })
}

fn find_binary(name: &str) -> Result<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default();
    // Debian/Ubuntu keep server binaries out of PATH.
    if let Ok(versions) = fs::read_dir("/usr/lib/postgresql") {
        let mut versions: Vec<PathBuf> = versions
            .filter_map(|entry| entry.ok().map(|entry| entry.path().join("bin")))
            .collect();
        versions.sort();
        dirs.extend(versions.into_iter().rev());
    }
    dirs.push(PathBuf::from("/opt/homebrew/bin"));

    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .with_context(|| format!("{name} binary not found"))
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve a port")?;
    Ok(listener.local_addr()?.port())
}

fn wait_until_ready(pg_isready: &Path, port: u16) -> Result<()> {
    let port = port.to_string();
    for _ in 0..50 {
        let ready = Command::new(pg_isready)
            .args(["-h", "127.0.0.1", "-p", &port, "-U", "postgres"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if ready {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(200));
    }
    bail!("postgres on port {port} did not become ready")
}
