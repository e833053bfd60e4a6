pub mod safety_work;
