use std::{fs, path::Path};

use mc_transaction::{TransactionSigner, Wallet};
use tracing::info;

use crate::NodeError;

/// Load the wallet whose hex secret key is stored at `path`, creating and
/// storing a fresh one if the file does not exist yet.
pub fn load_or_create(path: &Path) -> Result<Wallet, NodeError> {
    if path.exists() {
        let secret = fs::read_to_string(path)?;
        let wallet = Wallet::from_secret_hex(&secret)?;
        info!(path = %path.display(), public_key = %wallet.public_key(), "loaded wallet");
        return Ok(wallet);
    }

    let wallet = Wallet::generate();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, wallet.secret_hex())?;
    info!(path = %path.display(), public_key = %wallet.public_key(), "created wallet");
    Ok(wallet)
}
