/// Contact service driven over stdin/stdout, one JSON request per line.
///
/// # Example
///
/// ```text
/// $ echo '{"id":1,"owner":"alice","op":"list"}' | contacts-stdio
/// {"id":1,"ok":true,"result":{"items":[]}}
/// ```
///
/// # Environment Variables
///
/// - `CONTACTS_LOG`: logging filter (trace, debug, info, warn, error); logs go to stderr
/// - `CONTACTS_DATA_DIR`: override the data directory location
/// - `CONTACTS_STORE`: force a store backend (`sled` or `memory`)
#[cfg(feature = "stdio-server")]
#[tokio::main]
async fn main() {
    if let Err(err) = contacts_lib::run_stdio().await {
        eprintln!("[contacts::stdio] Runtime failed: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "stdio-server"))]
fn main() {
    eprintln!("[contacts::stdio] Build with `--features stdio-server` to enable the stdio driver.");
    std::process::exit(1);
}
