use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "CMP_HOST",
        "CMP_PORT",
        "CMP_DATABASE_URL",
        "CMP_SESSION_TTL_SECS",
        "CMP_EXPIRY_SWEEP_SECS",
        "CMP_OUTBOX_POLL_SECS",
        "CMP_MIN_INTENT_AMOUNT",
        "CMP_CURRENCY",
        "CMP_TRUST_ROLE_HEADER",
        "CMP_STRIPE_API_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let key_status = if env::var("CMP_STRIPE_SECRET_KEY").is_ok() { "Set (hidden)" } else { "Not set" };
    println!("  {:<35} {key_status:<15}", "CMP_STRIPE_SECRET_KEY");
}
