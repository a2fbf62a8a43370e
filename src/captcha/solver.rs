use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::captcha::detect::CaptchaKind;
use crate::error::FillerError;

/// Token source for CAPTCHA widgets. `Ok(None)` means "no token obtained".
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve_recaptcha_v2(&self, site_key: &str, page_url: &str) -> Result<Option<String>, FillerError>;

    async fn solve_hcaptcha(&self, site_key: &str, page_url: &str) -> Result<Option<String>, FillerError>;
}

/// Never solves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSolver;

#[async_trait]
impl CaptchaSolver for NullSolver {
    async fn solve_recaptcha_v2(&self, _site_key: &str, _page_url: &str) -> Result<Option<String>, FillerError> {
        Ok(None)
    }

    async fn solve_hcaptcha(&self, _site_key: &str, _page_url: &str) -> Result<Option<String>, FillerError> {
        Ok(None)
    }
}

/// Provider identifier from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaProvider {
    #[default]
    None,
    Anticaptcha,
    #[serde(rename = "2captcha")]
    TwoCaptcha,
    Capsolver,
}

impl fmt::Display for CaptchaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptchaProvider::None => "none",
            CaptchaProvider::Anticaptcha => "anticaptcha",
            CaptchaProvider::TwoCaptcha => "2captcha",
            CaptchaProvider::Capsolver => "capsolver",
        };
        f.write_str(s)
    }
}

impl FromStr for CaptchaProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(CaptchaProvider::None),
            "anticaptcha" => Ok(CaptchaProvider::Anticaptcha),
            "2captcha" | "twocaptcha" => Ok(CaptchaProvider::TwoCaptcha),
            "capsolver" => Ok(CaptchaProvider::Capsolver),
            other => Err(format!("unknown captcha provider '{}'", other)),
        }
    }
}

/// Per-solve timeout and bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout_secs: 120.0,
            max_retries: 2,
            initial_delay_ms: 1000,
            backoff: 1.5,
        }
    }
}

impl RetryPolicy {
    /// Budget for one solve attempt. Values that are not a finite,
    /// non-negative number of seconds fall back to the default.
    pub fn solve_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(RetryPolicy::default().timeout_secs))
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

/// Provider-selected solver wrapped in the retry policy.
#[derive(Clone)]
pub struct CaptchaHandler {
    provider: CaptchaProvider,
    solver: Arc<dyn CaptchaSolver>,
    policy: RetryPolicy,
}

impl fmt::Debug for CaptchaHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaHandler")
            .field("provider", &self.provider)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for CaptchaHandler {
    fn default() -> Self {
        Self::with_solver(CaptchaProvider::None, Arc::new(NullSolver), RetryPolicy::default())
    }
}

impl CaptchaHandler {
    /// Build the solver registered for `provider`.
    ///
    /// Providers with no registered integration degrade to [`NullSolver`].
    pub fn for_provider(provider: CaptchaProvider, policy: RetryPolicy) -> Self {
        if provider != CaptchaProvider::None {
            warn!(%provider, "no solver integration registered for provider, captchas will not be solved");
        }
        Self::with_solver(provider, Arc::new(NullSolver), policy)
    }

    pub fn with_solver(provider: CaptchaProvider, solver: Arc<dyn CaptchaSolver>, policy: RetryPolicy) -> Self {
        CaptchaHandler { provider, solver, policy }
    }

    pub fn provider(&self) -> CaptchaProvider {
        self.provider
    }

    /// Ask the solver for a token, retrying failed or timed-out attempts.
    /// Gives up with `None` once the retry budget is spent.
    pub async fn solve(&self, kind: CaptchaKind, site_key: &str, page_url: &str) -> Option<String> {
        let limit = self.policy.solve_timeout();
        let attempts = self.policy.max_retries.max(1);
        for attempt in 1..=attempts {
            let call = async {
                match kind {
                    CaptchaKind::RecaptchaV2 => self.solver.solve_recaptcha_v2(site_key, page_url).await,
                    CaptchaKind::Hcaptcha => self.solver.solve_hcaptcha(site_key, page_url).await,
                }
            };
            match tokio::time::timeout(limit, call).await {
                Ok(Ok(Some(token))) if !token.is_empty() => {
                    debug!(%kind, provider = %self.provider, attempt, "captcha solved");
                    return Some(token);
                }
                Ok(Ok(_)) => return None,
                Ok(Err(e)) => debug!(%kind, attempt, error = %e, "captcha solve attempt failed"),
                Err(_) => debug!(%kind, attempt, "captcha solve attempt timed out"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.delay_before(attempt)).await;
            }
        }
        None
    }
}
