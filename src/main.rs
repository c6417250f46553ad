extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate hra;

use clap::{Arg, ArgGroup, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use hra::{CodegenOptions, Machine, MachineConfig, Program};

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tMode: {}\n\tMemory: {}\n\tInputs: {:?}\n\tInfile: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 | _ => log::LevelFilter::Debug.to_string(),
        },
        if args.is_present("compile") { "compile" } else { "interpret" },
        args.value_of("memsize").unwrap_or("32"),
        args.values_of("input").map(|v| v.collect::<Vec<_>>()).unwrap_or_default(),
        args.value_of("INPUT").unwrap_or("None")
    );

    let ifile = args.value_of("INPUT").unwrap_or_default();
    let ipath = Path::new(ifile);

    let source = match std::fs::read_to_string(&ipath) {
        Err(err) => fatal(format!("unable to open input file `{}`: {}", ipath.display(), err)),
        Ok(source) => source,
    };

    let config = MachineConfig {
        memory_size: match args.value_of("memsize").unwrap_or("32").parse::<usize>() {
            Ok(size) => size,
            Err(err) => fatal(format!("invalid memory size: {}", err)),
        },
        inputs: match args.values_of("input") {
            Some(values) => values.map(|value| match value.parse::<i32>() {
                Ok(value) => value,
                Err(err) => fatal(format!("invalid input value `{}`: {}", value, err)),
            }).collect(),
            None => Vec::new(),
        },
    };

    let program = match hra::parse(hra::tokenize(&source)) {
        Err(err) => fatal(format!("syntax error in `{}`: {}", ipath.display(), err)),
        Ok(program) => program,
    };

    if args.is_present("listing") {
        print_listing(&program);
    }

    let machine = match hra::prepare(&program, &config) {
        Err(err) => fatal(err.to_string()),
        Ok(machine) => machine,
    };

    if args.is_present("compile") {
        compile(&args, ipath, &program, &machine, &config.inputs);
    } else {
        interpret(&args, &program, machine);
    }
}

fn compile(args: &ArgMatches, ipath: &Path, program: &Program, machine: &Machine, inputs: &[i32]) {
    let options = CodegenOptions {
        entry: args.value_of("entry").unwrap_or("_start").to_owned(),
        verbose: args.is_present("comments"),
    };

    let assembly = match hra::generate(program, machine, &options, inputs) {
        Err(err) => fatal(err.to_string()),
        Ok(assembly) => assembly,
    };

    let opath = match args.value_of("output") {
        Some("-") => {
            print!("{}", assembly);
            return;
        }
        Some(filename) => PathBuf::from(filename),
        None => ipath.with_extension("s"),
    };

    let mut ofile = match File::create(&opath) {
        Err(err) => fatal(format!("unable to open output file `{}`: {}", opath.display(), err)),
        Ok(file) => file,
    };

    if let Err(err) = ofile.write_all(assembly.as_bytes()) {
        fatal(format!("unable to write to output file `{}`: {}", opath.display(), err));
    }
    info!("wrote assembly to `{}`", opath.display());
}

fn interpret(args: &ArgMatches, program: &Program, machine: Machine) {
    let state = args.value_of("state").unwrap_or("none");

    let last = if state == "all" {
        let mut last = None;
        for snapshot in hra::run(program, machine) {
            match snapshot {
                Ok(snapshot) => {
                    println!("{}", snapshot);
                    last = Some(snapshot);
                }
                Err(err) => fatal(format!("runtime error: {}", err)),
            }
        }
        match last {
            Some(last) => last,
            None => fatal("program produced no state".to_owned()),
        }
    } else {
        match hra::run(program, machine).run() {
            Err(err) => fatal(format!("runtime error: {}", err)),
            Ok(last) => last,
        }
    };

    if state == "final" {
        println!("{}", last);
    }

    let printed: Vec<String> = last.output.iter().map(|value| value.to_string()).collect();
    if !printed.is_empty() {
        println!("{}", printed.concat());
    }
    println!("Output: {}", last.memory[0]);
}

fn print_listing(program: &Program) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for node in program.nodes.iter() {
        grid.add(Cell::from(format!("{:04}:", node.line)));
        grid.add(Cell::from(format!("{}", node)));
        grid.add(Cell::from("<=".to_string()));
        grid.add(Cell::from(format!("[{}]", node.params.join(", "))));
    }

    println!("{}", grid.fit_into_columns(4));
}

fn fatal(message: String) -> ! {
    error!("fatal: {}", message);
    std::process::exit(1);
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap_or("hra"))
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"))
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap_or(""))
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap_or(""))
        .arg(Arg::with_name("INPUT")
            .help("Sets the program file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("interpret")
            .short("t")
            .long("interpret")
            .takes_value(false)
            .help("run the program with the interpreter"))
        .arg(Arg::with_name("compile")
            .short("c")
            .long("compile")
            .takes_value(false)
            .help("compile the program to ARM assembly"))
        .group(ArgGroup::with_name("mode")
            .args(&["interpret", "compile"])
            .required(true))
        .arg(Arg::with_name("memsize")
            .short("m")
            .long("memsize")
            .value_name("SIZE")
            .takes_value(true)
            .default_value("32")
            .help("Allocate the size of the memory"))
        .arg(Arg::with_name("input")
            .short("i")
            .long("input")
            .value_name("VALUES")
            .takes_value(true)
            .multiple(true)
            .allow_hyphen_values(true)
            .help("initial memory values, in memory order"))
        .arg(Arg::with_name("state")
            .short("s")
            .long("state")
            .takes_value(true)
            .possible_values(&["final", "all", "none"])
            .default_value("none")
            .help("print the machine state while interpreting"))
        .arg(Arg::with_name("output")
            .short("o")
            .long("output")
            .takes_value(true)
            .help("write assembly to an outfile, `-` for STDOUT"))
        .arg(Arg::with_name("entry")
            .short("e")
            .long("entry")
            .takes_value(true)
            .default_value("_start")
            .help("entry label of the generated assembly"))
        .arg(Arg::with_name("comments")
            .long("comments")
            .takes_value(false)
            .help("annotate the generated assembly with the source lines"))
        .arg(Arg::with_name("listing")
            .short("d")
            .alias("show")
            .takes_value(false)
            .help("prints the parsed program to STDOUT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 | _ => log::LevelFilter::Debug,
        })
        .chain(std::io::stderr())
        .apply().ok();
}
