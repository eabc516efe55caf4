pub mod profile_writer;
pub mod scenario_reader;
