//! Destination classification: generative-AI services, sanctioned SaaS,
//! personal traffic, and internal address space.
//!
//! The classifier decides two things for every flow: which class of endpoint
//! the destination is, and whether privacy mode allows the flow to be
//! analyzed at all.

use std::net::IpAddr;

use ipnet::IpNet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::CoreConfig;

/// Known generative-AI and ML service hostnames.
const AI_DOMAINS: &[&str] = &[
    // Major LLM providers
    "openai.com",
    "api.openai.com",
    "chatgpt.com",
    "oaistatic.com",
    "oaiusercontent.com",
    "anthropic.com",
    "claude.ai",
    "api.anthropic.com",
    "huggingface.co",
    "hf.co",
    "api-inference.huggingface.co",
    "cohere.ai",
    "api.cohere.ai",
    "mistral.ai",
    "api.mistral.ai",
    "console.mistral.ai",
    "ai21.com",
    "studio.ai21.com",
    "perplexity.ai",
    "pplx.ai",
    // Google AI
    "gemini.google.com",
    "bard.google.com",
    "generativelanguage.googleapis.com",
    "ai.google.dev",
    "vertexai.google.com",
    "notebooklm.google.com",
    // Microsoft / GitHub Copilot
    "githubcopilot.com",
    "copilot-proxy.githubusercontent.com",
    "copilot.microsoft.com",
    "designer.microsoft.com",
    // Image & video generation
    "midjourney.com",
    "discord.com", // Midjourney is driven through Discord
    "stability.ai",
    "stable-diffusion.com",
    "clipdrop.co",
    "runwayml.com",
    "app.runwayml.com",
    "leonardo.ai",
    "app.leonardo.ai",
    "canva.com", // ships generative features throughout
    "pika.art",
    "sora.com",
    // Code assistants
    "tabnine.com",
    "api.tabnine.com",
    "codeium.com",
    "sourcelink.ai",
    "mutable.ai",
    "cursor.sh",
    "cursor.com",
    // Audio & speech
    "elevenlabs.io",
    "api.elevenlabs.io",
    "suno.ai",
    "app.suno.ai",
    "udio.com",
    "speechify.com",
    "murf.ai",
    // Agent platforms & tools
    "langchain.com",
    "smith.langchain.com",
    "crewai.com",
    "autogen.microsoft.com",
    "zapier.com", // high risk for automated AI workflows
    // Shadow infrastructure: serverless GPUs and inference hosts
    "replicate.com",
    "api.replicate.com",
    "modal.com",
    "together.xyz",
    "api.together.xyz",
    "fireworks.ai",
    "groq.com",
    "api.groq.com",
    "deepseeks.com",
    "chat.deepseek.com",
];

/// Company-sanctioned SaaS whose traffic is always monitored, even in privacy
/// mode, because it handles corporate data.
const CORPORATE_SAAS_DOMAINS: &[&str] = &[
    "slack.com",
    "notion.so",
    "github.com",
    "gitlab.com",
    "jira.atlassian.com",
    "confluence.atlassian.com",
    "docs.google.com",
    "drive.google.com",
    "mail.google.com",
    "calendar.google.com",
    "zoom.us",
    "teams.microsoft.com",
    "office365.com",
];

/// Personal traffic that privacy mode never analyzes.
const PERSONAL_DOMAINS: &[&str] = &[
    "netflix.com",
    "youtube.com",
    "spotify.com",
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "tiktok.com",
    "reddit.com",
    "amazon.com",
    "ebay.com",
    "bankofamerica.com",
    "chase.com",
    "paypal.com",
    "venmo.com",
];

/// RFC1918 address space treated as internal.
const PRIVATE_CIDRS: &[&str] = &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

/// Host and address classification used across the detector and pipeline.
pub struct DomainClassifier {
    ai: FxHashSet<&'static str>,
    corporate: FxHashSet<&'static str>,
    personal: FxHashSet<&'static str>,
    private_nets: Vec<IpNet>,
    privacy_mode: bool,
    monitor_unknown: bool,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}

impl DomainClassifier {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            ai: AI_DOMAINS.iter().copied().collect(),
            corporate: CORPORATE_SAAS_DOMAINS.iter().copied().collect(),
            personal: PERSONAL_DOMAINS.iter().copied().collect(),
            private_nets: PRIVATE_CIDRS
                .iter()
                .filter_map(|cidr| cidr.parse().ok())
                .collect(),
            privacy_mode: config.privacy_mode,
            monitor_unknown: config.monitor_unknown,
        }
    }

    /// Whether a host (or one of its parent domains) is a known AI service.
    ///
    /// Handles exact matches and subdomains: `cdn.openai.com` matches via its
    /// two-label parent `openai.com`, `eu.api.openai.com` via its three-label
    /// parent `api.openai.com`.
    pub fn is_ai_domain(&self, host: &str) -> bool {
        let host = host.trim().to_lowercase();
        if host.is_empty() {
            return false;
        }
        if self.ai.contains(host.as_str()) {
            return true;
        }
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() >= 2 && self.ai.contains(parts[parts.len() - 2..].join(".").as_str()) {
            return true;
        }
        parts.len() >= 3 && self.ai.contains(parts[parts.len() - 3..].join(".").as_str())
    }

    /// RFC1918 check. Non-address strings (hostnames) are not internal.
    pub fn is_internal(&self, ip: &str) -> bool {
        ip.parse::<IpAddr>()
            .map(|addr| self.private_nets.iter().any(|net| net.contains(&addr)))
            .unwrap_or(false)
    }

    /// Whether a destination represents corporate traffic.
    ///
    /// Private addresses are always corporate; a personal host is never
    /// corporate; a sanctioned-SaaS host always is; anything else follows the
    /// `monitor_unknown` knob (monitor by default).
    pub fn is_corporate_traffic(
        &self,
        dst_ip: &str,
        metadata: &FxHashMap<String, String>,
    ) -> bool {
        if self.is_internal(dst_ip) {
            return true;
        }
        let host = metadata
            .get("host")
            .or_else(|| metadata.get("sni"))
            .map(|h| h.to_lowercase())
            .unwrap_or_default();
        if !host.is_empty() {
            if self.personal.iter().any(|domain| host.contains(domain)) {
                return false;
            }
            if self.corporate.iter().any(|domain| host.contains(domain)) {
                return true;
            }
        }
        self.monitor_unknown
    }

    /// Master capture filter: privacy mode off means capture everything;
    /// privacy mode on restricts analysis to corporate traffic.
    pub fn should_capture(&self, dst_ip: &str, metadata: &FxHashMap<String, String>) -> bool {
        if !self.privacy_mode {
            return true;
        }
        self.is_corporate_traffic(dst_ip, metadata)
    }
}
