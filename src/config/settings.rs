use crate::core::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use crate::utils::{base64_decode, KeyPair};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:5000";

const NODE_NAME_KEY: &str = "NODE_NAME";
const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const NODE_DIFFICULTY_KEY: &str = "NODE_DIFFICULTY";

fn default_addr() -> String {
    DEFAULT_NODE_ADDR.to_string()
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_mine_empty_blocks() -> bool {
    true
}

/// Identity and tuning for one ledger node
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Self-asserted party name announced during the handshake
    pub name: String,
    /// Listen address; `":5000"` binds every interface
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Base64 SEC1 public key
    pub public_key: String,
    /// Base64 PKCS#8 secret key
    pub secret_key: String,
    /// Leading zero bytes required of a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Keep mining while no transactions are pending
    #[serde(default = "default_mine_empty_blocks")]
    pub mine_empty_blocks: bool,
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("difficulty", &self.difficulty)
            .field("mine_empty_blocks", &self.mine_empty_blocks)
            .finish()
    }
}

impl NodeConfig {
    /// Config with a freshly generated key pair
    pub fn generate(name: &str, addr: &str) -> Result<NodeConfig> {
        let keys = KeyPair::generate()?;
        Ok(NodeConfig {
            name: name.to_string(),
            addr: addr.to_string(),
            public_key: keys.public_key_base64(),
            secret_key: keys.secret_key_base64(),
            difficulty: DEFAULT_DIFFICULTY,
            mine_empty_blocks: true,
        })
    }

    pub fn with_difficulty(mut self, difficulty: usize) -> NodeConfig {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mine_empty_blocks(mut self, mine_empty_blocks: bool) -> NodeConfig {
        self.mine_empty_blocks = mine_empty_blocks;
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<NodeConfig> {
        let config: NodeConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Read a TOML file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<NodeConfig> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(name) = env::var(NODE_NAME_KEY) {
            self.name = name;
        }
        if let Ok(addr) = env::var(NODE_ADDRESS_KEY) {
            self.addr = addr;
        }
        if let Ok(difficulty) = env::var(NODE_DIFFICULTY_KEY) {
            self.difficulty = difficulty.parse().map_err(|e| {
                LedgerError::Config(format!("Invalid {NODE_DIFFICULTY_KEY} '{difficulty}': {e}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(LedgerError::Config("Node name must not be empty".to_string()));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "Difficulty {} exceeds the {MAX_DIFFICULTY}-byte hash",
                self.difficulty
            )));
        }
        base64_decode(&self.public_key)
            .map_err(|e| LedgerError::Config(format!("Invalid public key: {e}")))?;
        let pkcs8 = base64_decode(&self.secret_key)
            .map_err(|e| LedgerError::Config(format!("Invalid secret key: {e}")))?;
        let keys = KeyPair::from_pkcs8(&pkcs8)?;
        if keys.public_key_base64() != self.public_key {
            return Err(LedgerError::Config(
                "Public key does not match the secret key".to_string(),
            ));
        }
        Ok(())
    }

    /// Decoded PKCS#8 secret key
    pub fn secret_key_bytes(&self) -> Result<Vec<u8>> {
        base64_decode(&self.secret_key)
    }

    /// TOML rendering, used by `keygen` and the demo
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_generate_is_valid() {
        let config = NodeConfig::generate("C1", "127.0.0.1:0").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert!(config.mine_empty_blocks);
    }

    #[test]
    fn test_toml_defaults() {
        let generated = NodeConfig::generate("C1", "127.0.0.1:0").unwrap();
        let contents = format!(
            "name = \"C1\"\npublic_key = \"{}\"\nsecret_key = \"{}\"\n",
            generated.public_key, generated.secret_key
        );
        let config = NodeConfig::from_toml_str(&contents).unwrap();
        assert_eq!(config.addr, DEFAULT_NODE_ADDR);
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert!(config.mine_empty_blocks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let config = NodeConfig::generate("M1", "127.0.0.1:5002")
            .unwrap()
            .with_difficulty(2)
            .with_mine_empty_blocks(false);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = NodeConfig::load(file.path()).unwrap();
        assert_eq!(loaded.public_key, config.public_key);
        assert!(!loaded.mine_empty_blocks);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = NodeConfig::generate("C1", "127.0.0.1:0").unwrap();

        let mut empty_name = config.clone();
        empty_name.name.clear();
        assert!(empty_name.validate().is_err());

        let too_hard = config.clone().with_difficulty(MAX_DIFFICULTY + 1);
        assert!(too_hard.validate().is_err());

        let mut bad_key = config.clone();
        bad_key.secret_key = "???".to_string();
        assert!(bad_key.validate().is_err());

        let other = NodeConfig::generate("C2", "127.0.0.1:0").unwrap();
        let mut mismatched = config;
        mismatched.public_key = other.public_key;
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = NodeConfig::generate("C1", "127.0.0.1:0").unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&config.secret_key));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = NodeConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
