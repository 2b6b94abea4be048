use colored::*;
use itertools::Itertools;
use proofc::proof::{Numbering, Options};
use proofc::read_proof;

fn check_proof(path: &str, options: Options) -> Result<(), String> {
	let input = std::fs::read_to_string(path).map_err(|err| format!("can't read `{}`: {}", path, err))?;
	let derivation = read_proof(&input, options).map_err(|_| format!("`{}` is not a correct proof", path))?;

	print!("{}", derivation);
	let unused = derivation.unused();
	if !unused.is_empty() {
		println!("{}", format!("lines not used by the conclusion: {}", unused.iter().join(", ")).yellow());
	}
	println!("{}", format!("`{}` is OK", path).green().bold());
	Ok(())
}

fn main() {
	let mut options = Options::default();
	let mut path = None;
	for arg in std::env::args().skip(1) {
		match arg.as_str() {
			"--nested" => options.numbering = Numbering::Nested,
			"--strict-order" => options.any_order = false,
			_ => path = Some(arg),
		}
	}

	let path = match path {
		Some(path) => path,
		None => {
			eprintln!("usage: proofc [--nested] [--strict-order] <proof file>");
			std::process::exit(2);
		},
	};

	if let Err(err) = check_proof(&path, options) {
		eprintln!("{}", err.red());
		std::process::exit(1);
	}
}
