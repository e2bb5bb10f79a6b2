// Utility to compute ERC165 interface ids from function signatures
// Run with: cargo run --bin interface_id -- "balanceOf(address)" "ownerOf(uint256)"

use clap::Parser;
use token_harness::core::selector::{
    function_selector, InterfaceId, ERC165_SIGNATURES, ERC721_METADATA_SIGNATURES, ERC721_SIGNATURES,
};

#[derive(Parser)]
#[command(name = "interface_id")]
#[command(about = "Compute function selectors and the XOR interface id", long_about = None)]
struct Args {
    /// Canonical signatures, e.g. "transfer(address,uint256)"
    signatures: Vec<String>,

    /// Print the built-in standard interfaces instead
    #[arg(long)]
    standard: bool,
}

fn main() {
    let args = Args::parse();

    if args.standard || args.signatures.is_empty() {
        for (name, sigs) in [
            ("ERC165", ERC165_SIGNATURES),
            ("ERC721", ERC721_SIGNATURES),
            ("ERC721Metadata", ERC721_METADATA_SIGNATURES),
        ] {
            println!("{:<16} {}", name, InterfaceId::from_signatures(sigs));
        }
        return;
    }

    let sigs: Vec<&str> = args.signatures.iter().map(String::as_str).collect();
    for sig in &sigs {
        println!("0x{}  {}", hex::encode(function_selector(sig)), sig);
    }
    println!("interface id: {}", InterfaceId::from_signatures(&sigs));
}
