//! Static catalogs: candidate web paths and default ports.
//!
//! Everything here is read-only for the lifetime of the process.

use once_cell::sync::Lazy;

/// Candidate paths probed on every web target, most interesting first.
pub const COMMON_ENDPOINTS: &[&str] = &[
    // auth
    "/login",
    "/signin",
    "/logout",
    "/register",
    "/auth",
    "/oauth/authorize",
    "/.well-known/openid-configuration",
    // admin
    "/admin",
    "/admin/login",
    "/administrator",
    "/dashboard",
    "/console",
    "/manager/html",
    "/phpmyadmin",
    "/wp-admin",
    "/wp-login.php",
    // api
    "/api",
    "/api/v1",
    "/api/v2",
    "/graphql",
    "/graphiql",
    "/swagger",
    "/swagger-ui.html",
    "/swagger.json",
    "/openapi.json",
    "/api-docs",
    "/v2/api-docs",
    // monitoring
    "/health",
    "/healthz",
    "/status",
    "/metrics",
    "/actuator",
    "/actuator/health",
    "/actuator/env",
    "/server-status",
    "/debug/pprof",
    "/info",
    "/version",
    // source control and config leaks
    "/.git/HEAD",
    "/.git/config",
    "/.svn/entries",
    "/.hg/hgrc",
    "/.env",
    "/config.json",
    "/web.config",
    "/.DS_Store",
    "/backup.zip",
    // crawler hints
    "/robots.txt",
    "/sitemap.xml",
    "/crossdomain.xml",
    "/.well-known/security.txt",
];

pub const VERY_COMMON_PORTS: &[u16] = &[
    80,  // HTTP
    443, // HTTPS
    22,  // SSH
    21,  // FTP
    25,  // SMTP
    110, // POP3
    143, // IMAP
    993, // IMAPS
    445, // SMB
    139, // NetBIOS
];

pub const ENTERPRISE_PORTS: &[u16] = &[
    3389, // RDP
    3306, // MySQL
    1433, // MSSQL
    1521, // Oracle
    389,  // LDAP
    636,  // LDAPS
    8080, // HTTP alt / proxy
    8443, // HTTPS alt
    5900, // VNC
];

pub const SERVICE_PORTS: &[u16] = &[
    69, 88, 111, 119, 135, 161, 162, 554, 631, 2049, 2100, 4445, 4555, 8000, 8008, 8888,
];

pub const RARE_PORTS: &[u16] = &[
    23, 199, 1025, 1748, 1754, 1808, 1809, 3339, 5357, 5722, 9389, 47001,
];

/// Ports that are enumerated over HTTP(S) once found open.
pub const WEB_PORTS: &[u16] = &[80, 443, 8000, 8008, 8080, 8443, 8888];

/// Ports that speak TLS by convention.
pub const TLS_PORTS: &[u16] = &[443, 8443];

static DEFAULT_PORTS: Lazy<Vec<u16>> = Lazy::new(|| {
    let mut ports = Vec::with_capacity(
        VERY_COMMON_PORTS.len() + ENTERPRISE_PORTS.len() + SERVICE_PORTS.len() + RARE_PORTS.len(),
    );
    for group in [VERY_COMMON_PORTS, ENTERPRISE_PORTS, SERVICE_PORTS, RARE_PORTS] {
        for port in group {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }
    }
    ports
});

/// All default ports, ordered from most to least commonly used.
pub fn ports() -> Vec<u16> {
    DEFAULT_PORTS.clone()
}

pub fn is_web_port(port: u16) -> bool {
    WEB_PORTS.contains(&port)
}
