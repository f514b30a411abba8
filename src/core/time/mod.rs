pub mod windower;
