//! Data type catalog
//!
//! Maps the numeric type codes exchanged during data type negotiation to
//! their symbolic names. Scalar SQL types sit below 256; the internal RPC
//! and administrative pseudo-types use the extended numbering above it.

/// Sorted `(code, name)` pairs
pub static DATA_TYPES: &[(u16, &str)] = &[
    (0, "DEFAULT"),
    (1, "VARCHAR"),
    (2, "NUMBER"),
    (3, "BINARY_INTEGER"),
    (4, "FLOAT"),
    (5, "STR"),
    (6, "VNU"),
    (7, "PDN"),
    (8, "LONG"),
    (9, "VCS"),
    (10, "TID"),
    (11, "ROWID"),
    (12, "DATE"),
    (15, "VBI"),
    (23, "RAW"),
    (24, "LONG_RAW"),
    (25, "UB2"),
    (26, "UB4"),
    (27, "SB1"),
    (28, "SB2"),
    (29, "SB4"),
    (30, "SWORD"),
    (31, "UWORD"),
    (32, "PTRB"),
    (33, "PTRW"),
    (39, "OAC"),
    (40, "AMS"),
    (41, "BRN"),
    (68, "UIN"),
    (91, "SLS"),
    (94, "LVC"),
    (95, "LVB"),
    (96, "CHAR"),
    (97, "AVC"),
    (100, "BINARY_FLOAT"),
    (101, "BINARY_DOUBLE"),
    (102, "CURSOR"),
    (104, "RDD"),
    (106, "OSL"),
    (108, "EXT_NAMED"),
    (109, "INT_NAMED"),
    (110, "EXT_REF"),
    (111, "INT_REF"),
    (112, "CLOB"),
    (113, "BLOB"),
    (114, "BFILE"),
    (115, "CFILE"),
    (116, "RSET"),
    (117, "CWD"),
    (119, "JSON"),
    (120, "NEW_OAC"),
    (146, "CLV"),
    (152, "DTR"),
    (153, "DUN"),
    (154, "DOP"),
    (155, "VST"),
    (156, "ODT"),
    (178, "TIME"),
    (179, "TIME_TZ"),
    (180, "TIMESTAMP"),
    (181, "TIMESTAMP_TZ"),
    (182, "INTERVAL_YM"),
    (183, "INTERVAL_DS"),
    (184, "EDATE"),
    (185, "ETIME"),
    (186, "ETTZ"),
    (187, "ESTAMP"),
    (188, "ESTZ"),
    (189, "EIYM"),
    (190, "EIDS"),
    (195, "DCLOB"),
    (196, "DBLOB"),
    (197, "DBFILE"),
    (198, "DJSON"),
    (208, "UROWID"),
    (231, "TIMESTAMP_LTZ"),
    (232, "ESITZ"),
    (233, "UB8"),
    (241, "PNTY"),
    (252, "BOOLEAN"),
    (290, "OER8"),
    (291, "FUN"),
    (292, "AUA"),
    (293, "RXH7"),
    (294, "NA6"),
    (298, "BRP"),
    (299, "BRV"),
    (300, "KVA"),
    (301, "CLS"),
    (302, "CUI"),
    (303, "DFN"),
    (304, "DQR"),
    (305, "DSC"),
    (306, "EXE"),
    (307, "FCH"),
    (308, "GBV"),
    (309, "GEM"),
    (310, "GIV"),
    (311, "OKG"),
    (312, "HMI"),
    (313, "INO"),
    (315, "LNF"),
    (316, "ONT"),
    (317, "OPE"),
    (318, "OSQ"),
    (319, "SFE"),
    (320, "SPF"),
    (321, "VSN"),
    (322, "UD7"),
    (323, "DSA"),
    (325, "PIN"),
    (326, "PFN"),
    (327, "PPT"),
    (329, "STO"),
    (331, "ARC"),
    (332, "MRS"),
    (333, "MRT"),
    (334, "MRG"),
    (335, "MRR"),
    (336, "MRC"),
    (337, "VER"),
    (338, "LON2"),
    (339, "INO2"),
    (340, "ALL"),
    (341, "UDB"),
    (342, "AQI"),
    (343, "ULB"),
    (344, "ULD"),
    (346, "SID"),
    (347, "NA7"),
    (354, "AL7"),
    (355, "K2RPC"),
    (359, "XDP"),
    (360, "OKO8"),
    (380, "UD12"),
    (381, "AL8"),
    (382, "LFOP"),
    (383, "FCRT"),
    (384, "DNY"),
    (385, "OPR"),
    (386, "PLS"),
    (387, "XID"),
    (388, "TXN"),
    (389, "DCB"),
    (390, "CCA"),
    (391, "WRN"),
    (393, "TLH"),
    (394, "TOH"),
    (395, "FOI"),
    (396, "SID2"),
    (397, "TCH"),
    (398, "PII"),
    (399, "PFI"),
    (400, "PPU"),
    (401, "PTE"),
    (404, "RXH8"),
    (405, "N12"),
    (406, "AUTH"),
    (407, "KVAL"),
    (413, "FGI"),
    (414, "DSY"),
    (415, "DSYR8"),
    (416, "DSYH8"),
    (417, "DSYL"),
    (418, "DSYT8"),
    (419, "DSYV8"),
    (420, "DSYP"),
    (421, "DSYF"),
    (422, "DSYK"),
    (423, "DSYY"),
    (424, "DSYQ"),
    (425, "DSYC"),
    (426, "DSYA"),
    (427, "OT8"),
    (428, "DOL"),
    (429, "DSYTY"),
    (430, "AQE"),
    (431, "KV"),
    (432, "AQD"),
    (433, "AQ8"),
    (449, "RFS"),
    (450, "RXH10"),
    (454, "KPN"),
    (455, "KPDNR"),
    (456, "DSYD"),
    (457, "DSYS"),
    (458, "DSYR"),
    (459, "DSYH"),
    (460, "DSYT"),
    (461, "DSYV"),
    (462, "AQM"),
    (463, "OER11"),
    (469, "AQL"),
    (470, "OTC"),
    (471, "KFNO"),
    (472, "KFNP"),
    (473, "KGT8"),
    (474, "RASB4"),
    (475, "RAUB2"),
    (476, "RAUB1"),
    (477, "RATXT"),
    (478, "RSSB4"),
    (479, "RSUB2"),
    (480, "RSUB1"),
    (481, "RSTXT"),
    (482, "RIDL"),
    (483, "GLRDD"),
    (484, "GLRDG"),
    (485, "GLRDC"),
    (486, "OKO"),
    (487, "DPP"),
    (488, "DPLS"),
    (489, "DPMOP"),
    (490, "STAT"),
    (491, "RFX"),
    (492, "FAL"),
    (493, "CKV"),
    (494, "DRCX"),
    (495, "KGH"),
    (496, "AQO"),
    (498, "OKGT"),
    (499, "KPFC"),
    (500, "FE2"),
    (501, "SPFP"),
    (502, "DPULS"),
    (507, "AQA"),
    (508, "KPBF"),
    (513, "TSM"),
    (514, "MSS"),
    (516, "KPC"),
    (517, "CRS"),
    (518, "KKS"),
    (519, "KSP"),
    (520, "KSPTOP"),
    (521, "KSPVAL"),
    (522, "PSS"),
    (523, "NLS"),
    (524, "ALS"),
    (525, "KSDEVTVAL"),
    (526, "KSDEVTTOP"),
    (527, "KPSPP"),
    (528, "KOL"),
    (529, "LST"),
    (530, "ACX"),
    (531, "SCS"),
    (532, "RXH"),
    (533, "KPDNS"),
    (534, "KPDCN"),
    (535, "KPNNS"),
    (536, "KPNCN"),
    (537, "KPS"),
    (538, "APINF"),
    (539, "TEN"),
    (540, "XSSCS"),
    (541, "XSSSO"),
    (542, "XSSAO"),
    (543, "KSRPC"),
    (560, "KVL"),
    (563, "SESSGET"),
    (564, "SESSREL"),
    (565, "XSS"),
    (572, "PDQCINV"),
    (573, "PDQIDC"),
    (574, "KPDQCSTA"),
    (575, "KPRS"),
    (576, "KPDQIDC"),
    (578, "RTSTRM"),
    (579, "SESSRET"),
    (580, "SCN6"),
    (581, "KECPA"),
    (582, "KECPP"),
    (583, "SXA"),
    (584, "KVARR"),
    (585, "KPNGN"),
    (590, "XSNSOP"),
    (591, "XSATTR"),
    (592, "XSNS"),
    (593, "TXT"),
    (594, "XSSESSNS"),
    (595, "XSATTOP"),
    (596, "XSCREOP"),
    (597, "XSDETOP"),
    (598, "XSDESOP"),
    (599, "XSSETSP"),
    (600, "XSSIDP"),
    (601, "XSPRIN"),
    (602, "XSKVL"),
    (603, "XSSS2"),
    (604, "XSNSOP2"),
    (605, "XSNS2"),
    (611, "IMPLRES"),
    (612, "OER"),
    (613, "UB1ARRAY"),
    (614, "SESSSTATE"),
    (615, "AC_REPLAY"),
    (616, "AC_CONT"),
    (622, "KPDNREQ"),
    (623, "KPDNRNF"),
    (624, "KPNGNC"),
    (625, "KPNRI"),
    (626, "AQENQ"),
    (627, "AQDEQ"),
    (628, "AQJMS"),
    (629, "KPDNRPAY"),
    (630, "KPDNRACK"),
    (631, "KPDNRMP"),
    (632, "KPDNRDQ"),
    (636, "CHUNKINFO"),
    (637, "SCN"),
    (638, "SCN8"),
    (639, "UDS"),
    (640, "TNP"),
];

/// Look up the symbolic name of a data type code
pub fn data_type_name(code: u16) -> Option<&'static str> {
    DATA_TYPES
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|idx| DATA_TYPES[idx].1)
}

/// Look up the code for a symbolic name (case-sensitive)
pub fn data_type_code(name: &str) -> Option<u16> {
    DATA_TYPES.iter().find(|(_, n)| *n == name).map(|(c, _)| *c)
}

/// Name a data type code, falling back to `UNKNOWN(<code>)`
pub fn describe_data_type(code: u16) -> String {
    match data_type_name(code) {
        Some(name) => name.to_string(),
        None => format!("UNKNOWN({})", code),
    }
}
