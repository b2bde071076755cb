use anyhow::{Context, Result};

pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug)]
pub struct Args {
    pub passwords: Vec<String>,
    pub cost: u32,
}

/// Hash each password, one per line, in argument order.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_all(args: &Args) -> Result<Vec<String>> {
    args.passwords
        .iter()
        .map(|password| bcrypt::hash(password, args.cost).context("Failed to hash password"))
        .collect()
}

/// # Errors
/// Returns an error if hashing fails.
pub fn execute(args: &Args) -> Result<()> {
    for hash in hash_all(args)? {
        println!("{hash}");
    }
    Ok(())
}
