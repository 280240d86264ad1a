//! Generates Swift/Kotlin/Python bindings for checkout-mobile from a compiled
//! library, using uniffi_bindgen in library mode (uniffi 0.29.x).

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use uniffi_bindgen::bindings::{
    KotlinBindingGenerator, PythonBindingGenerator, SwiftBindingGenerator,
};
use uniffi_bindgen::library_mode::generate_bindings;
use uniffi_bindgen::{BindingGenerator, EmptyCrateConfigSupplier};

#[derive(Parser)]
#[command(name = "generate-bindings")]
#[command(about = "Generate UniFFI bindings for checkout-mobile")]
struct Cli {
    /// Path to the compiled library (.dylib, .so, or .a file)
    #[arg(long, default_value = "../target/release/libcheckout_mobile.dylib")]
    library: Utf8PathBuf,

    /// Output language
    #[arg(short = 'l', long = "language", default_value = "swift")]
    language: Language,

    /// Output directory (defaults to <language>/generated)
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Language {
    Swift,
    Kotlin,
    Python,
}

impl Language {
    fn name(self) -> &'static str {
        match self {
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Python => "python",
        }
    }
}

fn generate<G: BindingGenerator>(
    generator: &G,
    library: &Utf8Path,
    out_dir: &Utf8Path,
) -> anyhow::Result<()> {
    generate_bindings(
        library,
        None,
        generator,
        &EmptyCrateConfigSupplier,
        None,
        out_dir,
        false,
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let out_dir = cli
        .out_dir
        .unwrap_or_else(|| Utf8PathBuf::from(cli.language.name()).join("generated"));
    std::fs::create_dir_all(&out_dir)?;

    if !cli.library.exists() {
        anyhow::bail!("Library not found: {}", cli.library);
    }

    println!(
        "Generating {} bindings from {} into {}",
        cli.language.name(),
        cli.library,
        out_dir
    );

    match cli.language {
        Language::Swift => generate(&SwiftBindingGenerator, &cli.library, &out_dir)?,
        Language::Kotlin => generate(&KotlinBindingGenerator, &cli.library, &out_dir)?,
        Language::Python => generate(&PythonBindingGenerator, &cli.library, &out_dir)?,
    }

    println!("Bindings generated successfully");
    Ok(())
}
