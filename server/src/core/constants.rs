// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Findo";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "findo";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "findo.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "FINDO_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "FINDO_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "FINDO_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "FINDO_LOG";

// =============================================================================
// Environment Variables - Bootstrap Admin
// =============================================================================

/// Environment variable for the seeded admin email
pub const ENV_ADMIN_EMAIL: &str = "FINDO_ADMIN_EMAIL";

/// Environment variable for the seeded admin password
pub const ENV_ADMIN_PASSWORD: &str = "FINDO_ADMIN_PASSWORD";

/// Environment variable for the seeded admin display name
pub const ENV_ADMIN_NAME: &str = "FINDO_ADMIN_NAME";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5480;

// =============================================================================
// Authentication
// =============================================================================

/// Default session TTL in days
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;

// =============================================================================
// Request Body Limits
// =============================================================================

/// Default body limit for general API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Body limit for auth endpoints (64 KB)
pub const AUTH_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Search Requests
// =============================================================================

/// Maximum pharmacies notified per search fan-out. The notification batch
/// write tops out at 500 operations, so stay under it.
pub const FANOUT_MAX_RECIPIENTS: usize = 490;

/// Freshness window for live request streams (seconds)
pub const REQUEST_STREAM_WINDOW_SECS: i64 = 60 * 60;

/// Freshness window for one-shot active-request queries (seconds)
pub const REQUEST_QUERY_WINDOW_SECS: i64 = 5 * 60;

/// Most recent requests scanned when computing trending medicines
pub const TRENDING_SCAN_LIMIT: usize = 200;

/// Number of trending medicines returned
pub const TRENDING_TOP_N: usize = 5;

// =============================================================================
// SSE
// =============================================================================

/// Keep-alive interval for SSE streams (seconds)
pub const SSE_KEEP_ALIVE_SECS: u64 = 15;

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
