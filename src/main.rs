use std::{env, fs, process::ExitCode};
use toyc::{
    ast::Parser,
    compiler::Compiler,
    error::IoError,
    logging::{Logger, ASM_GENERATION, AST_BUILDING, COMPILING, LEXING, LOADING_SOURCE},
    src_file::SrcFile,
    tokenizer::Tokenizer,
    Args, Help, RunMode, Version,
};

fn main() -> ExitCode {
    let args = match Args::try_from(env::args()) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let (src_path, out_path) = match args.run_mode {
        RunMode::Help => {
            Help::print(args.color);
            return ExitCode::SUCCESS;
        }
        RunMode::Version => {
            Version::print(args.color);
            return ExitCode::SUCCESS;
        }
        RunMode::Compile { src_path, out_path } => (src_path, out_path),
    };

    let mut logger = Logger::new(args.verbosity);
    logger.step(&COMPILING, &src_path);

    let src = match SrcFile::load(&src_path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    logger.substep(&LOADING_SOURCE);

    let tokens = match Tokenizer::tokenize(&src) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{}", err.display(&src));
            return ExitCode::FAILURE;
        }
    };
    logger.substep(&LEXING);

    let program = match Parser::parse(&tokens) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}", err.display(&src));
            return ExitCode::FAILURE;
        }
    };
    logger.substep(&AST_BUILDING);

    let asm = match Compiler::compile(&program) {
        Ok(asm) => asm,
        Err(err) => {
            eprintln!("{}", err.display(&src));
            return ExitCode::FAILURE;
        }
    };
    logger.substep(&ASM_GENERATION);

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = fs::create_dir_all(parent) {
                let error = IoError {
                    kind: err.kind(),
                    msg: format!("could not create output directory '{}'", parent.display()).into(),
                    cause: err.to_string().into(),
                };
                eprintln!("{error}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(err) = fs::write(&out_path, asm) {
        let error = IoError {
            kind: err.kind(),
            msg: format!("could not write '{}'", out_path.display()).into(),
            cause: err.to_string().into(),
        };
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    logger.substep_done();
    logger.done();
    return ExitCode::SUCCESS;
}
