use packrat::driver;
use packrat_utils::MultiError;

fn main() -> Result<(), MultiError> {
    driver::run_optimizer()
}
