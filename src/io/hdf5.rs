/// Read / write per-event truth and reco records as HDF5 compound tables

use std::path::Path;

use ndarray::Array1;

use crate::samples::Param;

pub fn read_table<T: hdf5::H5Type>(filename: &dyn AsRef<Path>, dataset: &str) -> hdf5::Result<Array1<T>> {
    let file = ::hdf5::File::open(filename)?;
    let dataset = file.dataset(dataset)?;
    dataset.read_1d::<T>()
}

/// Write `data` to `dataset` in a newly-created `filename`. `dataset` may
/// contain `/`-separated groups, which are created as needed.
pub fn write_table<T: hdf5::H5Type>(filename: &dyn AsRef<Path>, dataset: &str, data: &[T]) -> hdf5::Result<()> {
    let file = ::hdf5::File::create(filename)?;
    write_into(&file, dataset, data)
}

/// Write several datasets into a single newly-created file
pub fn write_tables<'d, T, I>(filename: &dyn AsRef<Path>, datasets: I) -> hdf5::Result<()>
where
    T: hdf5::H5Type + 'd,
    I: IntoIterator<Item = (String, &'d [T])>,
{
    let file = ::hdf5::File::create(filename)?;
    for (name, data) in datasets {
        write_into(&file, &name, data)?;
    }
    Ok(())
}

fn write_into<T: hdf5::H5Type>(file: &hdf5::File, dataset: &str, data: &[T]) -> hdf5::Result<()> {
    let (groups, name) = match dataset.rsplit_once('/') {
        Some((groups, name)) => (Some(groups), name),
        None                 => (None        , dataset),
    };
    let group = match groups {
        Some(path) => match file.group(path) {
            Ok(group) => group,
            Err(_)    => file.create_group(path)?,
        },
        None => file.group("/")?,
    };
    group
        .new_dataset_builder()
        .with_data(data)
        .create(name)?;
    Ok(())
}

/// Names of the datasets directly inside `group`; none if there is no such
/// group
pub fn dataset_names(filename: &dyn AsRef<Path>, group: &str) -> hdf5::Result<Vec<String>> {
    let file = ::hdf5::File::open(filename)?;
    if !file.link_exists(group) { return Ok(vec![]) }
    let group = file.group(group)?;
    Ok(group.datasets()?.iter()
       .filter_map(|d| d.name().rsplit('/').next().map(str::to_string))
       .collect())
}

// --------------------------------------------------------------------------------

/// Event truth, as far as priors are concerned: true vertex, time and the
/// event's weight.
#[derive(hdf5::H5Type, Clone, Copy, PartialEq, Debug)]
#[repr(C)]
pub struct Truth {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub time: f32,
    pub weight: f32,
}

/// One reconstruction's estimate of an event's vertex and time
#[derive(hdf5::H5Type, Clone, Copy, PartialEq, Debug)]
#[repr(C)]
pub struct RecoEvent {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub time: f32,
    pub fit_status: i8,
}

/// Access to the reconstructed (or true) parameters of an event record
pub trait Params {
    fn param(&self, param: Param) -> f32;
}

macro_rules! impl_params {
    ($type:ty) => {
        impl Params for $type {
            fn param(&self, param: Param) -> f32 {
                match param {
                    Param::X    => self.x,
                    Param::Y    => self.y,
                    Param::Z    => self.z,
                    Param::Time => self.time,
                }
            }
        }
    };
}

impl_params!(Truth);
impl_params!(RecoEvent);
