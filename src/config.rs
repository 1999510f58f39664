pub mod priors;
