// generate_key.rs
// Utility to generate a new session token signing secret

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

const SECRET_BYTES: usize = 64;

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn main() {
    println!("Generating new session token signing secret...\n");

    let secret = generate_secret();

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("JWT_SECRET={}", secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this secret out of version control");
    println!("  • Rotating it invalidates every session token already issued");
}
