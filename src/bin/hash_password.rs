use std::env;

use strata_backend::auth::password;

/// Mints an argon2 hash for seeding the first staff account by hand.
fn main() {
    let password = env::args()
        .nth(1)
        .expect("Usage: cargo run --bin hash_password <password>");
    let hash = password::hash_password(&password).expect("hashing failed");
    println!("{}", hash);
}
