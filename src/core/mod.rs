// ─── modsync Core ───
// Cross-provider version resolution and download engine for Minecraft mods.
//
// Architecture:
//   core/
//     modlist/      — ModEntry model + parsing entries from URLs / ids
//     config/       — TOML configuration, immutable EngineConfig
//     providers/    — CurseForge, GitHub, Modrinth listing clients
//     matching/     — Candidate model, version distance, VersionMatcher
//     report/       — Match table, confirmation, run summary rendering
//     downloader/   — Concurrent streamed downloads with checksum validation
//     orchestrator/ — Resolve → confirm → download pipeline
//     retry         — Bounded exponential backoff
//     http          — Shared reqwest client

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod matching;
pub mod modlist;
pub mod orchestrator;
pub mod providers;
pub mod report;
pub mod retry;
