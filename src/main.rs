use std::{env, fs::read_to_string, path::Path, process, time::Instant};

use lispcheck::{
    display_error,
    parser::parser::parse_program,
    type_checker::type_checker::{type_check, TypeCheckerOptions},
};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut options = TypeCheckerOptions::default();
    let mut file_path = None;

    for arg in args.iter() {
        match arg.as_str() {
            "--no-builtins" => options.include_builtins = false,
            path if file_path.is_none() => file_path = Some(path),
            other => {
                eprintln!("Unexpected argument `{}`", other);
                usage();
            }
        }
    }

    let Some(file_path) = file_path else {
        usage();
    };

    let file_name = Path::new(file_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());

    let start = Instant::now();

    let file_contents = match read_to_string(file_path) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!("Failed to read `{}`: {}", file_path, error);
            process::exit(1);
        }
    };

    let program = match parse_program(&file_contents, Some(file_name.clone())) {
        Ok(program) => program,
        Err(error) => {
            display_error(&error, &file_contents, &file_name);
            process::exit(1);
        }
    };

    println!("Parsed in {:?}", start.elapsed());

    let type_check_start = Instant::now();
    let (type_checker, result) = type_check(&program, options);

    println!("Type checked in {:?}", type_check_start.elapsed());

    match result {
        Ok(ty) => {
            println!("Program type: {}", type_checker.type_name(ty));
            println!("Total time: {:?}", start.elapsed());
        }
        Err(error) => {
            display_error(&error, &file_contents, &file_name);
            process::exit(1);
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: lispcheck <file> [--no-builtins]");
    process::exit(2);
}
