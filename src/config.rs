use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::error::{RenewalError, Result};

/// Variables read by the first version of the job, kept so existing
/// deployments keep working without renaming their secrets.
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("helloasso.client_id", "HELLOASSO_API_ID"),
    ("helloasso.client_secret", "HELLOASSO_API_SECRET"),
    ("helloasso.org_slug", "HELLOASSO_ORG_SLUG"),
    ("helloasso.from_date", "HELLOASSO_FROM_DATE"),
    ("baserow.api_token", "BASEROW_API_TOKEN"),
    ("baserow.member_table_id", "BASEROW_MEMBER_TABLE_ID"),
    ("brevo.api_key", "BREVO_API_KEY"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub helloasso: HelloAssoConfig,
    pub baserow: BaserowConfig,
    pub brevo: BrevoConfig,
    pub reminder: ReminderConfig,
    pub membership: MembershipConfig,
    pub http: HttpConfig,
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HelloAssoConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub org_slug: String,
    /// Lower bound passed to the payments listing (`from` query parameter)
    pub from_date: String,
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BaserowConfig {
    pub api_url: String,
    pub api_token: String,
    pub member_table_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrevoConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_name: String,
    pub sender_email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReminderConfig {
    /// Minimum number of days between two reminders to the same member
    pub min_interval_days: i64,
    pub renewal_link_fr: String,
    pub renewal_link_en: String,
    /// When non-empty, reminders are only sent to these addresses
    #[serde(deserialize_with = "string_or_list")]
    pub allowlist: Vec<String>,
}

/// Accept a list from a file or a comma-separated string from the environment
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    let values = match StringOrList::deserialize(deserializer)? {
        StringOrList::String(joined) => joined.split(',').map(str::to_string).collect(),
        StringOrList::List(values) => values,
    };
    Ok(values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

#[derive(Debug, Deserialize, Clone)]
pub struct MembershipConfig {
    pub french_form_slug: String,
    pub english_form_slug: String,
    /// Number of months after which a payment no longer covers the membership
    pub validity_months: u32,
    pub french_language_id: i64,
    pub individual_type_id: i64,
    pub organization_type_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from `config/default`, an optional extra file, the
    /// `RENEWAL_*` environment and the legacy variable names, in that order.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = Self::defaults(config::Config::builder())?
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // No type guessing: secrets and ids such as `0123` must stay strings.
        builder = builder.add_source(
            config::Environment::with_prefix("RENEWAL")
                .prefix_separator("_")
                .separator("__"),
        );

        for (key, var) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(builder
            .set_default("helloasso.api_url", "https://api.helloasso.com")?
            .set_default("helloasso.client_id", "")?
            .set_default("helloasso.client_secret", "")?
            .set_default("helloasso.org_slug", "")?
            .set_default("helloasso.from_date", "")?
            .set_default("helloasso.page_size", 100)?
            .set_default("baserow.api_url", "https://baserow.boavizta.org")?
            .set_default("baserow.api_token", "")?
            .set_default("baserow.member_table_id", "")?
            .set_default("brevo.api_url", "https://api.sendinblue.com")?
            .set_default("brevo.api_key", "")?
            .set_default("brevo.sender_name", "Boavizta")?
            .set_default("brevo.sender_email", "no-reply@boavizta.org")?
            .set_default("reminder.min_interval_days", 14)?
            .set_default(
                "reminder.renewal_link_fr",
                "https://www.helloasso.com/associations/boavizta/adhesions/cotisation-annuelle",
            )?
            .set_default(
                "reminder.renewal_link_en",
                "https://www.helloasso.com/associations/boavizta/adhesions/annual-membership-fee",
            )?
            .set_default("reminder.allowlist", Vec::<String>::new())?
            .set_default("membership.french_form_slug", "cotisation-annuelle")?
            .set_default("membership.english_form_slug", "annual-membership-fee")?
            .set_default("membership.validity_months", 12)?
            .set_default("membership.french_language_id", 2591)?
            .set_default("membership.individual_type_id", 2521)?
            .set_default("membership.organization_type_id", 2520)?
            .set_default("http.timeout_secs", 30)?
            .set_default("run.dry_run", false)?)
    }

    /// Reject missing required values before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("helloasso.client_id", &self.helloasso.client_id),
            ("helloasso.client_secret", &self.helloasso.client_secret),
            ("helloasso.org_slug", &self.helloasso.org_slug),
            ("helloasso.from_date", &self.helloasso.from_date),
            ("baserow.api_token", &self.baserow.api_token),
            ("baserow.member_table_id", &self.baserow.member_table_id),
            ("brevo.api_key", &self.brevo.api_key),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            return Err(RenewalError::Config(format!(
                "missing required values: {}",
                missing.join(", ")
            )));
        }

        if self.helloasso.page_size == 0 {
            return Err(RenewalError::Config("helloasso.page_size must be positive".to_string()));
        }

        if self.reminder.min_interval_days < 0 {
            return Err(RenewalError::Config(
                "reminder.min_interval_days cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Build the shared HTTP client used by every collaborator.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout())
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL: &str = r#"
[helloasso]
client_id = "id"
client_secret = "secret"
org_slug = "boavizta"
from_date = "2023-01-01"

[baserow]
api_token = "token"
member_table_id = "42"

[brevo]
api_key = "key"
"#;

    fn parse(contents: &str) -> Config {
        let file = write_config(contents);
        Config::defaults(config::Config::builder())
            .unwrap()
            .add_source(config::File::from(file.path()))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse(FULL);
        assert!(config.validate().is_ok());
        assert_eq!(config.reminder.min_interval_days, 14);
        assert_eq!(config.membership.french_language_id, 2591);
        assert_eq!(config.membership.french_form_slug, "cotisation-annuelle");
        assert_eq!(config.helloasso.page_size, 100);
        assert!(config.reminder.allowlist.is_empty());
        assert!(!config.run.dry_run);
    }

    #[test]
    fn test_validate_lists_missing_values() {
        let config = parse("[baserow]\napi_token = \"token\"\n");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("helloasso.client_id"));
        assert!(err.contains("brevo.api_key"));
        assert!(!err.contains("baserow.api_token"));
    }

    #[test]
    fn test_file_allowlist_is_trimmed() {
        let config = parse(&format!(
            "{FULL}\n[reminder]\nallowlist = [\" a@x.org \", \"\"]\n"
        ));
        assert_eq!(config.reminder.allowlist, vec!["a@x.org"]);
    }

    #[test]
    fn test_load_reads_environment_and_legacy_names() {
        let file = write_config(FULL);
        let vars = [
            ("RENEWAL_HELLOASSO__CLIENT_ID", "0123"),
            ("RENEWAL_REMINDER__ALLOWLIST", "a@x.org, b@x.org"),
            ("RENEWAL_MEMBERSHIP__VALIDITY_MONTHS", "6"),
            ("RENEWAL_RUN__DRY_RUN", "true"),
            ("HELLOASSO_API_SECRET", "legacy-secret"),
            ("BASEROW_MEMBER_TABLE_ID", "0042"),
        ];
        for (name, value) in vars {
            std::env::set_var(name, value);
        }

        let loaded = Config::load(file.path().to_str());

        for (name, _) in vars {
            std::env::remove_var(name);
        }

        let config = loaded.unwrap();
        assert_eq!(config.helloasso.client_id, "0123");
        assert_eq!(config.helloasso.client_secret, "legacy-secret");
        assert_eq!(config.baserow.member_table_id, "0042");
        assert_eq!(config.baserow.api_token, "token");
        assert_eq!(config.reminder.allowlist, vec!["a@x.org", "b@x.org"]);
        assert_eq!(config.membership.validity_months, 6);
        assert!(config.run.dry_run);
    }

    #[test]
    fn test_http_timeout() {
        let config = parse(FULL);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }
}
