// Analyze words with cascades from a rules directory.
//
// Usage: cargo run -p morcas-morph --example analyze -- <dir> <cascade,...> <word>...
// Without arguments the sample rules in test-data/morph are used.
use std::path::PathBuf;

use morcas_morph::MorphHandle;

fn main() {
    let mut args = std::env::args().skip(1);
    let dir = args.next().map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-data/morph")
    });
    let names = args.next().unwrap_or_else(|| "v,n".to_string());
    let names: Vec<&str> = names.split(',').collect();
    let mut words: Vec<String> = args.collect();
    if words.is_empty() {
        words = ["sabar", "sabaru", "saber", "gadaru", "xyz"]
            .map(String::from)
            .to_vec();
    }

    let handle = match MorphHandle::load_dir(&dir, &names) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{err}");
            if let morcas_morph::MorphError::Compile(compile) = &err {
                for e in compile.errors() {
                    eprintln!("  {e}");
                }
            }
            std::process::exit(1);
        }
    };
    println!("Loaded {:?}\n", handle);

    for (word, analyses) in words.iter().zip(handle.analyze_batch(&words[..])) {
        if analyses.is_empty() {
            println!("{:12} → ?{}", word, word);
            continue;
        }
        println!("{:12} → {} analyses", word, analyses.len());
        for a in &analyses {
            println!(
                "  {:10} {:4} {} ({:.1})",
                a.root(),
                a.pos().unwrap_or("-"),
                a.features(),
                a.score()
            );
        }
    }
}
