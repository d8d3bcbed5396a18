//! Standalone exact-division verifier, the command-line cousin of the
//! link's checksum engine.
//!
//! ```text
//! cargo run --example crc_divide -- --msg 11010011101100 --gen 1011
//! cargo run --example crc_divide -- --hex 012345 --gen 10011
//! ```

use crclink::crc::{bits, division, GeneratorPoly};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut msg: Option<String> = None;
    let mut hex: Option<String> = None;
    let mut gen: Option<String> = None;
    let mut i = 1;
    while i + 1 < args.len() {
        match args[i].as_str() {
            "--msg" => msg = Some(args[i + 1].clone()),
            "--hex" => hex = Some(args[i + 1].clone()),
            "--gen" => gen = Some(args[i + 1].clone()),
            other => {
                eprintln!("unknown flag {}", other);
                std::process::exit(2);
            }
        }
        i += 2;
    }

    let (Some(gen), true) = (gen, msg.is_some() != hex.is_some()) else {
        eprintln!("Usage: crc_divide (--msg <bits> | --hex <hex>) --gen <bits>");
        std::process::exit(2);
    };

    let msg_bits = match (msg, hex) {
        (Some(m), _) => m,
        (_, Some(h)) => bits::bits_from_hex(&h)?,
        _ => unreachable!(),
    };

    let poly = GeneratorPoly::parse(&gen)?;
    let remainder = division::remainder(&msg_bits, &poly)?;
    let codeword = division::codeword(&msg_bits, &poly)?;
    let (check, ok) = division::verify(&codeword, &poly)?;

    println!("message     = {}", msg_bits);
    println!("generator   = {}  (degree {})", poly, poly.width() - 1);
    println!("remainder   = {}", remainder);
    println!("codeword    = {}", codeword);
    println!("re-division = {}  {}", check, if ok { "ok" } else { "FAILED" });
    println!();
    println!("{}", division::DivisionTrace::capture(&msg_bits, &poly)?.render());

    Ok(())
}
