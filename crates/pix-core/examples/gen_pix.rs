//! Generates a Pix code and its QR image
//!
//! Usage: cargo run -p pix-core --example gen_pix -- <email> <name> <city> [amount]

use std::fs;
use std::path::Path;

use anyhow::Context;
use pix_core::render::{render_qr_code, QrOptions};
use pix_core::{KeyType, Parser, PayloadBuilder};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let key = args.first().map(String::as_str).unwrap_or("test@example.com");
    let name = args.get(1).map(String::as_str).unwrap_or("JOHN DOE");
    let city = args.get(2).map(String::as_str).unwrap_or("SAO PAULO");

    let mut builder = PayloadBuilder::new();
    builder
        .pix_key(KeyType::Email, key)?
        .merchant_name(name)?
        .merchant_city(city)?;
    if let Some(amount) = args.get(3) {
        builder.amount(amount)?;
    }

    let code = builder.finalize()?;
    Parser::new().decode(&code).context("generated code does not decode")?;
    println!("{}", code);

    let output_dir = Path::new("generated_pix");
    fs::create_dir_all(output_dir)?;

    let png = render_qr_code(&code, &QrOptions::png(8))?;
    fs::write(output_dir.join("pix.png"), png.as_bytes())?;

    let terminal = render_qr_code(&code, &QrOptions::terminal())?;
    println!("{}", String::from_utf8_lossy(terminal.as_bytes()));

    println!("Saved {:?}", output_dir.join("pix.png"));
    Ok(())
}
