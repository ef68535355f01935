use std::path::{Path, PathBuf};

use bootimage_repack::header::consts::boot::{MAX_CMDLINE_LEN, MAX_NAME_LEN};
use bootimage_repack::header::consts::mtk::MAX_MTK_NAME_LEN;
use bootimage_repack::header::PageSize;
use bootimage_repack::pack::{pack, PackConfig, PackMode, SectionSource, LARGE_IMAGE_WARNING_SIZE};
use bootimage_repack::unpack::unpack_file;
use bootimage_repack::UnpackError;
use clap::Parser;
use console::ConsoleOutputHandler;
use humansize::{format_size, BINARY};
use termcolor::ColorChoice;
use tracing_subscriber::EnvFilter;

/// Packs, unpacks and builds Android boot images, including images with
/// MTK wrapped sections.
#[derive(Parser, Debug)]
#[command(name = "bootimage-repack", version)]
struct Cli {
    /// Pack the unpacked image in DIR
    #[arg(long, value_name = "DIR", value_parser = existing_dir, conflicts_with = "unpack")]
    pack: Option<PathBuf>,

    /// Unpack IMAGE into the directory given by --output
    #[arg(long, value_name = "IMAGE", value_parser = existing_file)]
    unpack: Option<PathBuf>,

    /// Kernel image, required when building from scratch
    #[arg(long, value_name = "FILE", value_parser = existing_file, required_unless_present_any = ["pack", "unpack"])]
    kernel: Option<PathBuf>,

    /// Ramdisk image, required when building from scratch
    #[arg(long, value_name = "FILE", value_parser = existing_file, required_unless_present_any = ["pack", "unpack"])]
    ramdisk: Option<PathBuf>,

    /// Second stage image
    #[arg(long, value_name = "FILE", value_parser = existing_file)]
    second: Option<PathBuf>,

    /// Load address base, in hex. Every address is moved along with it
    #[arg(long, value_name = "HEX", value_parser = parse_hex)]
    base: Option<u32>,

    #[arg(long = "kernel_offset", value_name = "HEX", value_parser = parse_hex)]
    kernel_offset: Option<u32>,

    #[arg(long = "ramdisk_offset", value_name = "HEX", value_parser = parse_hex)]
    ramdisk_offset: Option<u32>,

    #[arg(long = "second_offset", value_name = "HEX", value_parser = parse_hex)]
    second_offset: Option<u32>,

    #[arg(long = "tags_offset", value_name = "HEX", value_parser = parse_hex)]
    tags_offset: Option<u32>,

    /// One of 2048, 4096, 8192 or 16384
    #[arg(long, value_name = "SIZE", value_parser = parse_page_size)]
    pagesize: Option<PageSize>,

    /// Template for the MTK header of the kernel
    #[arg(long = "mtk_kernel_header", value_name = "FILE", value_parser = existing_file)]
    mtk_kernel_header: Option<PathBuf>,

    /// Template for the MTK header of the ramdisk
    #[arg(long = "mtk_ramdisk_header", value_name = "FILE", value_parser = existing_file)]
    mtk_ramdisk_header: Option<PathBuf>,

    /// Section name for the MTK header of the ramdisk, e.g. RECOVERY
    #[arg(long = "mtk_ramdisk_name", value_name = "NAME", value_parser = parse_mtk_name)]
    mtk_ramdisk_name: Option<String>,

    /// Wrap kernel and ramdisk in MTK headers even without templates
    #[arg(long = "mtk_force")]
    mtk_force: bool,

    /// Kernel command line
    #[arg(long, value_parser = parse_cmdline)]
    cmdline: Option<String>,

    /// Board name
    #[arg(long, value_parser = parse_board)]
    board: Option<String>,

    /// Image to write, or directory to unpack into
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Log every step
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pack_config(&self) -> PackConfig {
        PackConfig {
            mode: match &self.pack {
                Some(dir) => PackMode::Template { dir: dir.clone() },
                None => PackMode::Build,
            },
            kernel: self.kernel.clone().map(SectionSource::Path),
            ramdisk: self.ramdisk.clone().map(SectionSource::Path),
            second: self.second.clone().map(SectionSource::Path),
            base: self.base,
            kernel_offset: self.kernel_offset,
            ramdisk_offset: self.ramdisk_offset,
            second_offset: self.second_offset,
            tags_offset: self.tags_offset,
            page_size: self.pagesize,
            cmdline: self.cmdline.clone(),
            board: self.board.clone(),
            mtk_kernel_header: self.mtk_kernel_header.clone().map(SectionSource::Path),
            mtk_ramdisk_header: self.mtk_ramdisk_header.clone().map(SectionSource::Path),
            mtk_ramdisk_name: self.mtk_ramdisk_name.clone(),
            mtk_force: self.mtk_force,
            output: self.output.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bootimage_repack=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let console = ConsoleOutputHandler::new(ColorChoice::Auto);
    match &cli.unpack {
        Some(image) => main_unpack(image, &cli.output, console),
        None => main_pack(&cli, console),
    }
}

fn main_pack(cli: &Cli, mut console: ConsoleOutputHandler) {
    let config = cli.pack_config();
    match &config.mode {
        PackMode::Template { dir } => console.print_status_success(
            "Packing",
            &format!("'{}' into '{}'.", dir.display(), config.output.display()),
        ),
        PackMode::Build => console.print_status_success(
            "Building",
            &format!("'{}'.", config.output.display()),
        ),
    }

    let report = match pack(&config) {
        Ok(report) => report,
        Err(error) => console.print_fatal_error("Failed to pack boot image", Some(&error)),
    };

    if report.mtk {
        console.print_status_success("Wrapped", "kernel and ramdisk in MTK headers.");
    }
    console.print_message(report.header.summary().to_string().trim_end());
    console.print_status_success(
        "Finished",
        &format!(
            "'{}' ({}).",
            config.output.display(),
            format_size(report.written, BINARY)
        ),
    );
    if report.is_large() {
        console.print_warning_message(&format!(
            "The image is larger than {}, it may not fit the boot partition.",
            format_size(LARGE_IMAGE_WARNING_SIZE, BINARY)
        ));
    }
}

fn main_unpack(image: &Path, destination: &Path, mut console: ConsoleOutputHandler) {
    let report = match unpack_file(image, destination) {
        Ok(report) => report,
        Err(UnpackError::DestinationExists(path)) => {
            console.print_warning_message(&format!(
                "The directory '{}' already exists. It may hold an older unpacked image, \
                 rename or delete it first.",
                path.display()
            ));
            std::process::exit(1);
        }
        Err(error) => console.print_fatal_error(
            &format!("Failed to unpack '{}'", image.display()),
            Some(&error),
        ),
    };

    console.print_message(report.header.summary().to_string().trim_end());
    console.print_status_success(
        "Saved",
        &format!("image header into '{}'.", report.header_path.display()),
    );
    for unpacked in &report.sections {
        let mtk = match &unpacked.mtk_name {
            Some(name) => format!(" MTK section called \"{}\".", name),
            None => String::new(),
        };
        console.print_status_success(
            "Unpacked",
            &format!(
                "{} into '{}' ({}).{}",
                unpacked.section,
                unpacked.path.display(),
                format_size(unpacked.size, BINARY),
                mtk
            ),
        );
    }
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{}' not found", value))
    }
}

fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory '{}' not found", value))
    }
}

fn parse_hex(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).map_err(|error| format!("'{}' is not a hex number: {}", value, error))
}

fn parse_page_size(value: &str) -> Result<PageSize, String> {
    let size: u32 = value.parse().map_err(|error| format!("'{}': {}", value, error))?;
    PageSize::try_from(size).map_err(|error| error.to_string())
}

fn bounded(value: &str, max: usize, what: &str) -> Result<String, String> {
    if value.len() > max {
        Err(format!("{} is longer than {} characters", what, max))
    } else {
        Ok(value.to_owned())
    }
}

fn parse_cmdline(value: &str) -> Result<String, String> {
    bounded(value, MAX_CMDLINE_LEN, "command line")
}

fn parse_board(value: &str) -> Result<String, String> {
    bounded(value, MAX_NAME_LEN, "board name")
}

fn parse_mtk_name(value: &str) -> Result<String, String> {
    bounded(value, MAX_MTK_NAME_LEN, "MTK section name")
}

mod console {
    use std::error::Error;
    use std::io::Write;
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    /// Coloured status output for the user. Write errors are ignored.
    pub struct ConsoleOutputHandler {
        stream: StandardStream,
    }

    impl ConsoleOutputHandler {
        pub fn new(color: ColorChoice) -> Self {
            ConsoleOutputHandler {
                stream: StandardStream::stdout(color),
            }
        }

        pub fn print_message(&mut self, message: &str) {
            let _ = self.stream.set_color(&ColorSpec::new());
            let _ = writeln!(self.stream, "{}", message);
        }

        pub fn print_error_message(&mut self, message: &str) {
            let _ = self
                .stream
                .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = write!(self.stream, "error: ");
            self.print_message(message);
        }

        pub fn print_warning_message(&mut self, message: &str) {
            let _ = self
                .stream
                .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
            let _ = write!(self.stream, "warning: ");
            self.print_message(message);
        }

        fn print_status(&mut self, colour: &ColorSpec, status: &str, message: &str) {
            let _ = self.stream.set_color(colour);
            let _ = write!(self.stream, "{: >12}", status);
            let _ = self.stream.set_color(&ColorSpec::new());
            let _ = writeln!(self.stream, " {}", message);
        }

        pub fn print_status_success(&mut self, status: &str, message: &str) {
            self.print_status(
                ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
                status,
                message,
            );
        }

        fn print_error_cause(&mut self, mut error_opt: Option<&dyn Error>, colour: Color) {
            let mut colour_spec = ColorSpec::new();
            colour_spec.set_fg(Some(colour));

            while let Some(error) = error_opt {
                let _ = self.stream.set_color(&colour_spec);
                let _ = write!(self.stream, "caused by: ");
                self.print_message(&error.to_string());
                error_opt = error.source();
            }
        }

        pub fn print_error_as_error(&mut self, message: &str, error_opt: Option<&dyn Error>) {
            self.print_error_message(message);
            self.print_error_cause(error_opt, Color::Red);
        }

        pub fn print_fatal_error(&mut self, message: &str, error_opt: Option<&dyn Error>) -> ! {
            self.print_error_as_error(message, error_opt);
            std::process::exit(1);
        }
    }
}
