// Per-event records live in HDF5 tables; N-d lookup tables are `.npy` files
// handled directly in `crate::tables`.
pub mod hdf5;
